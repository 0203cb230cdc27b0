//! Attack resolution: turns a click into an attack id, a combo continuation,
//! or a parry.
//!
//! Resolution reads the combat flags *after* this tick's animation step, so a
//! combo window opened by a marker this tick can already be chained into.

use serde::{Deserialize, Serialize};

use riposte_core::ids::EntityId;
use riposte_core::input::AttackClick;
use riposte_core::math::Vec3;
use riposte_core::state::AttackState;
use riposte_core::weapon::WeaponData;

use crate::animation::{AnimationStep, Param};
use crate::oracle::ParryOracle;

/// Stage name of the attack step.
pub const ATTACK_STAGE: &str = "attack";

/// A parry performed by `parrier` against `target`'s attack. The authority
/// answers it by playing the "got parried" reaction on the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParryEvent {
    pub parrier: EntityId,
    pub target: EntityId,
}

/// What a click resolved to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackOutcome {
    /// No click this tick.
    Idle,
    /// The click arrived during a hit reaction or outside a combo window.
    Locked,
    /// The click has no valid continuation, or nothing is equipped.
    Dropped,
    /// An attack was requested from the animation layer.
    Attack { attack_id: i32, combo: bool },
    /// A parry was performed instead of a heavy attack.
    Parry(ParryEvent),
}

/// Everything besides the click and the animation flags that resolution
/// depends on.
#[derive(Clone, Copy)]
pub struct AttackContext<'a> {
    pub entity: EntityId,
    pub position: Vec3,
    pub weapon: Option<&'a WeaponData>,
    pub parry_radius: f32,
    pub parry: &'a dyn ParryOracle,
}

/// Resolve `click` against the previous attack slice and the current
/// animation flags. Accepted attacks and parries are requested on
/// `animation` directly.
pub fn run_attack_step(
    prev: &AttackState,
    click: AttackClick,
    animation: &mut AnimationStep,
    ctx: &AttackContext<'_>,
) -> (AttackState, AttackOutcome) {
    if click == AttackClick::None {
        return (*prev, AttackOutcome::Idle);
    }

    let attacking = animation.flag(Param::Attacking);
    let can_combo = animation.flag(Param::CanCombo);
    if animation.flag(Param::TakingDamage) || (attacking && !can_combo) {
        tracing::trace!(entity = %ctx.entity, ?click, "attack click locked out");
        return (*prev, AttackOutcome::Locked);
    }

    let Some(weapon) = ctx.weapon else {
        tracing::warn!(entity = %ctx.entity, "no weapon equipped, dropping attack");
        return (*prev, AttackOutcome::Dropped);
    };

    let attack_id = match click {
        AttackClick::None => return (*prev, AttackOutcome::Idle),
        AttackClick::Light => resolve_light(prev.last_attack_id, can_combo, weapon),
        AttackClick::Heavy => {
            if !attacking && !animation.flag(Param::Parrying) {
                let center = ctx.position + Vec3::UP;
                if let Some(target) = ctx.parry.nearest_parryable(ctx.entity, center, ctx.parry_radius) {
                    if animation.play_parry(weapon.do_parry_id, false) {
                        tracing::debug!(entity = %ctx.entity, %target, "parry");
                        let event = ParryEvent {
                            parrier: ctx.entity,
                            target,
                        };
                        return (*prev, AttackOutcome::Parry(event));
                    }
                }
            }
            resolve_heavy(prev.last_attack_id, can_combo, weapon)
        }
    };

    let Some(attack_id) = attack_id else {
        tracing::trace!(entity = %ctx.entity, last = prev.last_attack_id, "no combo continuation");
        return (*prev, AttackOutcome::Dropped);
    };
    if !animation.play_attack(attack_id) {
        return (*prev, AttackOutcome::Dropped);
    }

    tracing::trace!(entity = %ctx.entity, attack_id, combo = can_combo, "attack");
    (
        AttackState {
            last_attack_id: attack_id,
        },
        AttackOutcome::Attack {
            attack_id,
            combo: can_combo,
        },
    )
}

fn resolve_light(last_attack_id: i32, can_combo: bool, weapon: &WeaponData) -> Option<i32> {
    if !can_combo {
        Some(weapon.light_attack_one_id)
    } else if last_attack_id == weapon.light_attack_one_id {
        Some(weapon.light_attack_two_id())
    } else if last_attack_id == weapon.light_attack_two_id() {
        Some(weapon.light_attack_three_id())
    } else {
        None
    }
}

fn resolve_heavy(last_attack_id: i32, can_combo: bool, weapon: &WeaponData) -> Option<i32> {
    if !can_combo || last_attack_id == weapon.light_attack_two_id() {
        Some(weapon.heavy_attack_one_id)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::LocomotionSignals;
    use crate::oracle::stub::{FixedParry, NoParry};
    use riposte_core::weapon::{WeaponCatalog, WeaponName};

    const DT: f32 = 1.0 / 60.0;
    const ME: EntityId = EntityId::new(1);
    const FOE: EntityId = EntityId::new(2);

    fn sword() -> WeaponData {
        WeaponCatalog::default()
            .get(WeaponName::Sword)
            .cloned()
            .unwrap()
    }

    fn ctx<'a>(weapon: Option<&'a WeaponData>, parry: &'a dyn ParryOracle) -> AttackContext<'a> {
        AttackContext {
            entity: ME,
            position: Vec3::ZERO,
            weapon,
            parry_radius: 2.25,
            parry,
        }
    }

    fn grounded() -> LocomotionSignals {
        LocomotionSignals {
            motion_speed: 1.0,
            grounded: true,
            ..Default::default()
        }
    }

    /// Tick the animation until `param` is set. Panics after two seconds.
    fn tick_until(step: &mut AnimationStep, param: Param) {
        for _ in 0..120 {
            step.tick(DT, &grounded());
            if step.flag(param) {
                return;
            }
        }
        panic!("{param:?} never set");
    }

    #[test]
    fn no_click_is_idle() {
        let weapon = sword();
        let mut anim = AnimationStep::with_clip_graph();
        let (state, outcome) =
            run_attack_step(&AttackState::default(), AttackClick::None, &mut anim, &ctx(Some(&weapon), &NoParry));
        assert_eq!(outcome, AttackOutcome::Idle);
        assert_eq!(state, AttackState::default());
    }

    #[test]
    fn first_light_click_starts_combo() {
        let weapon = sword();
        let mut anim = AnimationStep::with_clip_graph();
        let (state, outcome) =
            run_attack_step(&AttackState::default(), AttackClick::Light, &mut anim, &ctx(Some(&weapon), &NoParry));
        assert_eq!(
            outcome,
            AttackOutcome::Attack {
                attack_id: 101,
                combo: false
            }
        );
        assert_eq!(state.last_attack_id, 101);
        assert!(anim.flag(Param::Attacking));
        assert_eq!(anim.id(Param::AttackId), 101);
    }

    #[test]
    fn click_outside_combo_window_is_locked() {
        let weapon = sword();
        let c = ctx(Some(&weapon), &NoParry);
        let mut anim = AnimationStep::with_clip_graph();
        let (state, _) = run_attack_step(&AttackState::default(), AttackClick::Light, &mut anim, &c);
        anim.tick(DT, &grounded());
        let (after, outcome) = run_attack_step(&state, AttackClick::Light, &mut anim, &c);
        assert_eq!(outcome, AttackOutcome::Locked);
        assert_eq!(after, state);
    }

    #[test]
    fn light_chain_runs_one_two_three_then_stops() {
        let weapon = sword();
        let c = ctx(Some(&weapon), &NoParry);
        let mut anim = AnimationStep::with_clip_graph();
        let (mut state, _) = run_attack_step(&AttackState::default(), AttackClick::Light, &mut anim, &c);

        for expected in [102, 103] {
            tick_until(&mut anim, Param::CanCombo);
            let (next, outcome) = run_attack_step(&state, AttackClick::Light, &mut anim, &c);
            assert_eq!(
                outcome,
                AttackOutcome::Attack {
                    attack_id: expected,
                    combo: true
                }
            );
            state = next;
        }
        assert_eq!(state.last_attack_id, 103);
    }

    #[test]
    fn heavy_chains_only_from_second_light() {
        let weapon = sword();
        let c = ctx(Some(&weapon), &NoParry);

        // From 101 inside the combo window: dropped.
        let mut anim = AnimationStep::with_clip_graph();
        let (state, _) = run_attack_step(&AttackState::default(), AttackClick::Light, &mut anim, &c);
        tick_until(&mut anim, Param::CanCombo);
        let (_, outcome) = run_attack_step(&state, AttackClick::Heavy, &mut anim, &c);
        assert_eq!(outcome, AttackOutcome::Dropped);

        // From 102 inside the combo window: heavy.
        let (state, _) = run_attack_step(&state, AttackClick::Light, &mut anim, &c);
        tick_until(&mut anim, Param::CanCombo);
        let (state, outcome) = run_attack_step(&state, AttackClick::Heavy, &mut anim, &c);
        assert_eq!(
            outcome,
            AttackOutcome::Attack {
                attack_id: 104,
                combo: true
            }
        );
        assert_eq!(state.last_attack_id, 104);
    }

    #[test]
    fn heavy_near_parryable_foe_parries() {
        let weapon = sword();
        let parry = FixedParry(FOE);
        let mut anim = AnimationStep::with_clip_graph();
        let prev = AttackState { last_attack_id: 103 };
        let (state, outcome) = run_attack_step(&prev, AttackClick::Heavy, &mut anim, &ctx(Some(&weapon), &parry));
        assert_eq!(
            outcome,
            AttackOutcome::Parry(ParryEvent {
                parrier: ME,
                target: FOE
            })
        );
        assert_eq!(state, prev);
        assert!(anim.flag(Param::Parrying));
        assert_eq!(anim.id(Param::ParryId), weapon.do_parry_id);
        assert!(!anim.flag(Param::Attacking));
    }

    #[test]
    fn no_parry_while_attacking() {
        let weapon = sword();
        let parry = FixedParry(FOE);
        let c = ctx(Some(&weapon), &parry);
        let mut anim = AnimationStep::with_clip_graph();
        let (state, _) = run_attack_step(&AttackState::default(), AttackClick::Light, &mut anim, &c);
        let (state, _) = run_attack_step(&state, AttackClick::Light, &mut anim, &c);
        assert_eq!(state.last_attack_id, 101);
        tick_until(&mut anim, Param::CanCombo);
        let (_, outcome) = run_attack_step(&state, AttackClick::Heavy, &mut anim, &c);
        assert_eq!(outcome, AttackOutcome::Dropped);
        assert!(!anim.flag(Param::Parrying));
    }

    #[test]
    fn hit_reaction_locks_attacks() {
        let weapon = sword();
        let mut anim = AnimationStep::with_clip_graph();
        anim.play_take_damage(1);
        let (_, outcome) =
            run_attack_step(&AttackState::default(), AttackClick::Light, &mut anim, &ctx(Some(&weapon), &NoParry));
        assert_eq!(outcome, AttackOutcome::Locked);
        assert!(!anim.flag(Param::Attacking));
    }

    #[test]
    fn unarmed_drops_every_click() {
        let mut anim = AnimationStep::with_clip_graph();
        let parry = FixedParry(FOE);
        for click in [AttackClick::Light, AttackClick::Heavy] {
            let (_, outcome) = run_attack_step(&AttackState::default(), click, &mut anim, &ctx(None, &parry));
            assert_eq!(outcome, AttackOutcome::Dropped);
        }
        assert!(!anim.flag(Param::Attacking));
        assert!(!anim.flag(Param::Parrying));
    }
}
