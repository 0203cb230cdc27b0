//! The per-entity tick pipeline.
//!
//! [`EntitySimulator`] owns one entity's state and runs the fixed stage order
//! once per tick:
//!
//! 1. gravity/jump
//! 2. grounded check
//! 3. movement + rotation
//! 4. camera
//! 5. animation
//! 6. attack resolution
//! 7. damage aggregation
//!
//! The same pipeline runs on every participant. The owner predicts with it,
//! the authority simulates with it, observers extrapolate with it, and
//! reconciliation replays buffered inputs through it in
//! [`StepMode::Resimulate`].
//!
//! # Determinism
//!
//! Given the same state, input and collaborator answers, a step produces a
//! bit-identical [`StateSnapshot`]. All per-entity mutable data that affects
//! the next tick lives in the snapshot; the only other mutable piece, the
//! animation playback, is rebuilt from the snapshot by
//! [`EntitySimulator::force_set`].

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use riposte_core::config::SimConfig;
use riposte_core::ids::{EntityId, Tick, SPAWN_TICK};
use riposte_core::input::InputSnapshot;
use riposte_core::state::StateSnapshot;
use riposte_core::weapon::{WeaponCatalog, WeaponData, WeaponName};

use crate::animation::{AnimationEvent, AnimationPlayback, AnimationStep, LocomotionSignals, Param};
use crate::attack::{run_attack_step, AttackContext, AttackOutcome, ParryEvent, ATTACK_STAGE};
use crate::camera::{orientation, run_camera_step, CameraOrientation, CAMERA_STAGE};
use crate::damage::{run_damage_step, DamageContext, DamageEvent, DAMAGE_STAGE};
use crate::locomotion::{
    run_gravity_step, run_grounded_check, run_movement_step, MovementLocks, GRAVITY_STAGE,
    GROUNDED_STAGE, MOVEMENT_STAGE,
};
use crate::oracle::Oracles;

/// Stage name of the animation step.
pub const ANIMATION_STAGE: &str = "animation";

/// The fixed order in which stages run within a tick.
pub const STAGE_ORDER: [&str; 7] = [
    GRAVITY_STAGE,
    GROUNDED_STAGE,
    MOVEMENT_STAGE,
    CAMERA_STAGE,
    ANIMATION_STAGE,
    ATTACK_STAGE,
    DAMAGE_STAGE,
];

// ---------------------------------------------------------------------------
// StepMode
// ---------------------------------------------------------------------------

/// Why a step is being run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepMode {
    /// A new tick. Queued reactions are applied and combat events are
    /// reported.
    Live,
    /// Replaying an already simulated tick during reconciliation. Combat
    /// events are discarded so their effects are applied exactly once.
    Resimulate,
}

// ---------------------------------------------------------------------------
// Reaction
// ---------------------------------------------------------------------------

/// An authority-issued reaction, applied at the start of the entity's next
/// live tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Reaction {
    /// Play a hit reaction.
    TakeDamage { take_damage_id: i32 },
    /// Play this entity's "got parried" reaction.
    GetParried,
}

// ---------------------------------------------------------------------------
// TickOutput
// ---------------------------------------------------------------------------

/// Everything one step produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutput {
    pub tick: Tick,
    pub state: StateSnapshot,
    /// Hits committed this tick. Always empty when resimulating.
    pub damage: Vec<DamageEvent>,
    /// Parries performed this tick. Always empty when resimulating.
    pub parries: Vec<ParryEvent>,
    /// Animation events raised this tick.
    pub animation_events: Vec<AnimationEvent>,
    /// What the attack click resolved to.
    pub attack: AttackOutcome,
}

// ---------------------------------------------------------------------------
// StepDiagnostics
// ---------------------------------------------------------------------------

/// Timing diagnostics for the last step.
#[derive(Debug, Clone, Default)]
pub struct StepDiagnostics {
    /// Wall-clock time per stage, in [`STAGE_ORDER`].
    pub stage_times: Vec<(&'static str, Duration)>,
    /// Total time for the step.
    pub total_time: Duration,
}

// ---------------------------------------------------------------------------
// EntitySimulator
// ---------------------------------------------------------------------------

/// One entity's simulation: current state, animation driver, equipped weapon.
#[derive(Debug)]
pub struct EntitySimulator {
    entity: EntityId,
    config: SimConfig,
    dt: f32,
    weapon_name: WeaponName,
    weapon: Option<WeaponData>,
    tick: Tick,
    state: StateSnapshot,
    animation: AnimationStep,
    reactions: Vec<Reaction>,
    last_diagnostics: StepDiagnostics,
}

impl EntitySimulator {
    /// Simulate `entity` from `spawn` at [`SPAWN_TICK`], driving the reference
    /// clip graph. The entity starts unarmed.
    pub fn new(entity: EntityId, config: &SimConfig, spawn: StateSnapshot) -> Self {
        Self::with_animation(entity, config, spawn, AnimationStep::with_clip_graph())
    }

    /// Simulate `entity` with a custom animation playback.
    pub fn with_playback(
        entity: EntityId,
        config: &SimConfig,
        spawn: StateSnapshot,
        playback: Box<dyn AnimationPlayback>,
    ) -> Self {
        Self::with_animation(entity, config, spawn, AnimationStep::new(playback))
    }

    fn with_animation(
        entity: EntityId,
        config: &SimConfig,
        spawn: StateSnapshot,
        animation: AnimationStep,
    ) -> Self {
        let mut sim = Self {
            entity,
            config: config.clone(),
            dt: config.tick_dt(),
            weapon_name: WeaponName::None,
            weapon: None,
            tick: SPAWN_TICK,
            state: spawn,
            animation,
            reactions: Vec::new(),
            last_diagnostics: StepDiagnostics::default(),
        };
        sim.animation.force_set(&sim.state.animation);
        // The playback may resolve an empty clip to its entry clip.
        sim.state.animation = sim.animation.capture();
        sim
    }

    /// Equip `name` from `catalog`. Unknown weapons leave the entity unarmed.
    pub fn equip(&mut self, name: WeaponName, catalog: &WeaponCatalog) {
        self.weapon = catalog.get(name).cloned();
        self.weapon_name = if self.weapon.is_some() {
            name
        } else {
            if name != WeaponName::None {
                tracing::warn!(entity = %self.entity, ?name, "weapon not in catalog, unarmed");
            }
            WeaponName::None
        };
    }

    /// Queue a reaction for the next live tick.
    pub fn queue_reaction(&mut self, reaction: Reaction) {
        tracing::debug!(entity = %self.entity, ?reaction, "reaction queued");
        self.reactions.push(reaction);
    }

    /// Overwrite the simulator with `state` as the result of `tick`.
    pub fn force_set(&mut self, tick: Tick, state: &StateSnapshot) {
        tracing::trace!(entity = %self.entity, tick, "force set");
        self.tick = tick;
        self.state = state.clone();
        self.animation.force_set(&state.animation);
    }

    /// Run the pipeline for `tick`.
    pub fn step(
        &mut self,
        tick: Tick,
        input: &InputSnapshot,
        oracles: &Oracles<'_>,
        mode: StepMode,
    ) -> TickOutput {
        let step_start = Instant::now();
        let mut stage_times = Vec::with_capacity(STAGE_ORDER.len());
        let dt = self.dt;

        if mode == StepMode::Live {
            self.apply_reactions();
        }
        let locomotion = &self.config.locomotion;
        let prev = &self.state;

        let start = Instant::now();
        let (jump, jump_signals) =
            run_gravity_step(&prev.jump, prev.grounded, input.jump, locomotion, dt);
        stage_times.push((GRAVITY_STAGE, start.elapsed()));

        let start = Instant::now();
        let grounded = run_grounded_check(oracles.ground, prev.movement.position, locomotion);
        stage_times.push((GROUNDED_STAGE, start.elapsed()));

        let start = Instant::now();
        let locks = MovementLocks::from_flags(
            self.animation.flag(Param::Attacking),
            self.animation.flag(Param::CanCombo),
            self.animation.flag(Param::TakingDamage),
        );
        let movement = run_movement_step(
            self.entity,
            &prev.movement,
            jump.vertical_velocity,
            &input.movement,
            prev.camera.yaw,
            locks,
            locomotion,
            dt,
            oracles.motion,
        );
        stage_times.push((MOVEMENT_STAGE, start.elapsed()));

        let start = Instant::now();
        let camera = run_camera_step(&prev.camera, &input.look, &self.config.camera, dt);
        stage_times.push((CAMERA_STAGE, start.elapsed()));

        let start = Instant::now();
        let signals = LocomotionSignals {
            speed: movement.state.animation_blend,
            motion_speed: movement.motion_speed,
            grounded,
            jump: jump_signals.jump,
            free_fall: jump_signals.free_fall,
        };
        let animation_events = self.animation.tick(dt, &signals);
        stage_times.push((ANIMATION_STAGE, start.elapsed()));

        let start = Instant::now();
        let attack_ctx = AttackContext {
            entity: self.entity,
            position: movement.state.position,
            weapon: self.weapon.as_ref(),
            parry_radius: self.config.combat.parry_radius,
            parry: oracles.parry,
        };
        let (attack, attack_outcome) =
            run_attack_step(&prev.attack, input.attack, &mut self.animation, &attack_ctx);
        stage_times.push((ATTACK_STAGE, start.elapsed()));

        let start = Instant::now();
        let damage_ctx = DamageContext {
            attacker: self.entity,
            position: movement.state.position,
            yaw: movement.state.yaw,
            weapon: self.weapon.as_ref(),
            hit_origin_height: self.config.combat.hit_origin_height,
            hits: oracles.hits,
        };
        let (damage, mut committed) = run_damage_step(
            &prev.damage,
            self.animation.params(),
            &animation_events,
            &damage_ctx,
        );
        stage_times.push((DAMAGE_STAGE, start.elapsed()));

        let mut parries = match attack_outcome {
            AttackOutcome::Parry(event) => vec![event],
            _ => Vec::new(),
        };
        if mode == StepMode::Resimulate {
            committed.clear();
            parries.clear();
        }

        self.state = StateSnapshot {
            jump,
            grounded,
            movement: movement.state,
            camera,
            animation: self.animation.capture(),
            attack,
            damage,
        };
        self.tick = tick;
        self.last_diagnostics = StepDiagnostics {
            stage_times,
            total_time: step_start.elapsed(),
        };
        tracing::trace!(entity = %self.entity, tick, ?mode, "step");

        TickOutput {
            tick,
            state: self.state.clone(),
            damage: committed,
            parries,
            animation_events,
            attack: attack_outcome,
        }
    }

    fn apply_reactions(&mut self) {
        for reaction in std::mem::take(&mut self.reactions) {
            match reaction {
                Reaction::TakeDamage { take_damage_id } => {
                    self.animation.play_take_damage(take_damage_id);
                }
                Reaction::GetParried => match &self.weapon {
                    Some(weapon) => {
                        self.animation.play_parry(weapon.get_parried_id, true);
                    }
                    None => {
                        tracing::warn!(entity = %self.entity, "parried while unarmed, ignoring");
                    }
                },
            }
        }
    }

    /// Entity being simulated.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Tick of the current state.
    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Current state.
    pub fn state(&self) -> &StateSnapshot {
        &self.state
    }

    /// Equipped weapon selector.
    pub fn weapon_name(&self) -> WeaponName {
        self.weapon_name
    }

    /// Equipped weapon data, `None` when unarmed.
    pub fn weapon(&self) -> Option<&WeaponData> {
        self.weapon.as_ref()
    }

    /// Shared configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Fixed tick period in seconds.
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// The animation driver.
    pub fn animation(&self) -> &AnimationStep {
        &self.animation
    }

    /// Reactions waiting for the next live tick.
    pub fn pending_reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    /// Camera orientation for rendering.
    pub fn camera_orientation(&self) -> CameraOrientation {
        orientation(&self.state.camera, &self.config.camera)
    }

    /// Timing diagnostics of the last step.
    pub fn last_diagnostics(&self) -> &StepDiagnostics {
        &self.last_diagnostics
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
