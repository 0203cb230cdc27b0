//! Collaborator interfaces consumed by the pipeline.
//!
//! The simulation never queries a physics scene or polls a device directly.
//! Everything it needs from the outside world goes through the traits below,
//! bundled per tick in an [`Oracles`] value. Determinism therefore reduces to
//! the determinism of these collaborators: the [`stub`] implementations are
//! pure functions of their arguments, which is what the tests and headless
//! sessions run against.

use riposte_core::ids::{EntityId, LayerMask, Tick};
use riposte_core::input::InputSnapshot;
use riposte_core::math::Vec3;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Sphere-overlap query used by the grounded check.
pub trait GroundOracle {
    /// Whether a sphere at `center` with `radius` overlaps any collider on a
    /// layer in `mask`.
    fn check_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> bool;
}

/// Melee hit query used by the damage aggregator.
pub trait HitScanOracle {
    /// Entities (other than `attacker`) hit by a weapon sweep from `origin`
    /// along `direction` over `range`.
    fn scan(
        &self,
        attacker: EntityId,
        origin: Vec3,
        direction: Vec3,
        range: f32,
        mask: LayerMask,
    ) -> Vec<EntityId>;
}

/// Proximity query used by the parry check.
pub trait ParryOracle {
    /// The nearest entity within `radius` of `center` whose current attack
    /// can be parried, excluding `entity` itself.
    fn nearest_parryable(&self, entity: EntityId, center: Vec3, radius: f32) -> Option<EntityId>;
}

/// Character-controller motion with collision response.
pub trait MotionResolver {
    /// The position reached by moving `entity` from `from` by `displacement`.
    fn resolve(&self, entity: EntityId, from: Vec3, displacement: Vec3) -> Vec3;
}

/// Device polling on the owning side.
pub trait InputSampler {
    /// Sample the input for `tick`. Called exactly once per tick.
    fn sample(&mut self, tick: Tick) -> InputSnapshot;
}

// ---------------------------------------------------------------------------
// Oracles
// ---------------------------------------------------------------------------

/// The collaborators one pipeline step may consult.
#[derive(Clone, Copy)]
pub struct Oracles<'a> {
    /// Grounded check.
    pub ground: &'a dyn GroundOracle,
    /// Melee hit scan.
    pub hits: &'a dyn HitScanOracle,
    /// Parry proximity.
    pub parry: &'a dyn ParryOracle,
    /// Motion resolution.
    pub motion: &'a dyn MotionResolver,
}

// ---------------------------------------------------------------------------
// Stubs
// ---------------------------------------------------------------------------

/// Deterministic collaborators for headless runs and tests.
pub mod stub {
    use std::collections::BTreeMap;

    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg64;

    use super::*;
    use riposte_core::input::{AttackClick, LookInput, MoveInput};
    use riposte_core::math::Vec2;

    /// An infinite horizontal floor at `height`.
    ///
    /// Acts both as the ground for the grounded check and as the collision
    /// surface for motion: nothing can move below the floor.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FlatGround {
        /// Floor height.
        pub height: f32,
    }

    impl FlatGround {
        /// A floor at `height`.
        pub fn at(height: f32) -> Self {
            Self { height }
        }
    }

    impl GroundOracle for FlatGround {
        fn check_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> bool {
            mask.intersects(LayerMask::GROUND) && center.y - radius <= self.height
        }
    }

    impl MotionResolver for FlatGround {
        fn resolve(&self, _entity: EntityId, from: Vec3, displacement: Vec3) -> Vec3 {
            let mut to = from + displacement;
            if to.y < self.height {
                to.y = self.height;
            }
            to
        }
    }

    /// Motion without any collision.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct FreeMotion;

    impl MotionResolver for FreeMotion {
        fn resolve(&self, _entity: EntityId, from: Vec3, displacement: Vec3) -> Vec3 {
            from + displacement
        }
    }

    /// Hit scan over a fixed set of targets.
    ///
    /// A target registered without a position is hit by every sweep; a
    /// positioned target is hit when it lies in front of the sweep origin and
    /// within range.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedHits {
        targets: BTreeMap<EntityId, Option<Vec3>>,
    }

    impl ScriptedHits {
        /// A scan that never hits anything.
        pub fn none() -> Self {
            Self::default()
        }

        /// A scan that hits `targets` on every sweep.
        pub fn always(targets: impl IntoIterator<Item = EntityId>) -> Self {
            Self {
                targets: targets.into_iter().map(|t| (t, None)).collect(),
            }
        }

        /// Add a target standing at `position`.
        pub fn with_target_at(mut self, target: EntityId, position: Vec3) -> Self {
            self.targets.insert(target, Some(position));
            self
        }
    }

    impl HitScanOracle for ScriptedHits {
        fn scan(
            &self,
            attacker: EntityId,
            origin: Vec3,
            direction: Vec3,
            range: f32,
            mask: LayerMask,
        ) -> Vec<EntityId> {
            if !mask.intersects(LayerMask::PLAYER) {
                return Vec::new();
            }
            self.targets
                .iter()
                .filter(|(target, _)| **target != attacker)
                .filter(|(_, position)| match position {
                    None => true,
                    Some(p) => {
                        let to = Vec3::new(p.x - origin.x, 0.0, p.z - origin.z);
                        let ahead = to.x * direction.x + to.z * direction.z;
                        ahead >= 0.0 && to.horizontal_length() <= range
                    }
                })
                .map(|(target, _)| *target)
                .collect()
        }
    }

    /// A parry check that never finds a target.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct NoParry;

    impl ParryOracle for NoParry {
        fn nearest_parryable(&self, _entity: EntityId, _center: Vec3, _radius: f32) -> Option<EntityId> {
            None
        }
    }

    /// A parry check that always reports the same target.
    #[derive(Debug, Clone, Copy)]
    pub struct FixedParry(pub EntityId);

    impl ParryOracle for FixedParry {
        fn nearest_parryable(&self, entity: EntityId, _center: Vec3, _radius: f32) -> Option<EntityId> {
            (self.0 != entity).then_some(self.0)
        }
    }

    /// Flat floor at the origin, no hits, no parries.
    #[derive(Debug, Clone, Default)]
    pub struct Headless {
        /// Floor and motion.
        pub ground: FlatGround,
        /// Hit scan.
        pub hits: ScriptedHits,
        /// Parry lookup.
        pub parry: NoParry,
    }

    impl Headless {
        /// Borrow as an [`Oracles`] bundle.
        pub fn oracles(&self) -> Oracles<'_> {
            Oracles {
                ground: &self.ground,
                hits: &self.hits,
                parry: &self.parry,
                motion: &self.ground,
            }
        }
    }

    /// Replays a fixed list of inputs, then idles.
    #[derive(Debug, Clone, Default)]
    pub struct ScriptedSampler {
        inputs: Vec<InputSnapshot>,
        cursor: usize,
    }

    impl ScriptedSampler {
        /// Sample `inputs` in order, one per tick.
        pub fn new(inputs: Vec<InputSnapshot>) -> Self {
            Self { inputs, cursor: 0 }
        }
    }

    impl InputSampler for ScriptedSampler {
        fn sample(&mut self, _tick: Tick) -> InputSnapshot {
            let input = self.inputs.get(self.cursor).copied().unwrap_or_default();
            self.cursor += 1;
            input
        }
    }

    /// Seeded pseudo-random player. Holds each decision for a few ticks so the
    /// generated play resembles a human rather than white noise.
    #[derive(Debug, Clone)]
    pub struct RandomSampler {
        rng: Pcg64,
        held: InputSnapshot,
        hold_remaining: u32,
    }

    impl RandomSampler {
        /// A sampler whose sequence is fully determined by `seed`.
        pub fn new(seed: u64) -> Self {
            Self {
                rng: Pcg64::seed_from_u64(seed),
                held: InputSnapshot::default(),
                hold_remaining: 0,
            }
        }

        fn axis(&mut self) -> f32 {
            f32::from(self.rng.gen_range(-1i8..=1))
        }
    }

    impl InputSampler for RandomSampler {
        fn sample(&mut self, _tick: Tick) -> InputSnapshot {
            if self.hold_remaining == 0 {
                self.held = InputSnapshot {
                    jump: false,
                    movement: MoveInput {
                        direction: Vec2::new(self.axis(), self.axis()),
                        sprint: self.rng.gen_bool(0.3),
                    },
                    look: LookInput {
                        delta: Vec2::new(self.rng.gen_range(-4.0..4.0), self.rng.gen_range(-2.0..2.0)),
                        pointer: true,
                    },
                    attack: AttackClick::None,
                };
                self.hold_remaining = self.rng.gen_range(4..30);
            }
            self.hold_remaining -= 1;

            // Buttons are edge-triggered: a press lasts a single tick.
            let mut input = self.held;
            input.jump = self.rng.gen_bool(0.02);
            input.attack = match self.rng.gen_range(0..100) {
                0..=3 => AttackClick::Light,
                4 => AttackClick::Heavy,
                _ => AttackClick::None,
            };
            input
        }
    }

}
