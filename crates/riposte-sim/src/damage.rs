//! Melee damage: per-window hit collection and the authority's health ledger.
//!
//! While the attacker's damage window is open, every tick sweeps the weapon
//! through the [`HitScanOracle`]. Each target is recorded at most once per
//! window (first hit wins). The hits are committed as [`DamageEvent`]s on the
//! attack's damage frame, or dropped if the attack is interrupted first.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use riposte_core::ids::{EntityId, LayerMask};
use riposte_core::math::{forward_from_yaw, Vec3};
use riposte_core::state::DamageState;
use riposte_core::weapon::WeaponData;

use crate::animation::{AnimationEvent, Param, ParamTable};
use crate::oracle::HitScanOracle;

/// Stage name of the damage step.
pub const DAMAGE_STAGE: &str = "damage";

/// A committed melee hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DamageEvent {
    pub attacker: EntityId,
    pub target: EntityId,
    pub amount: u32,
    /// Hit reaction the target plays.
    pub take_damage_id: i32,
}

/// Attacker-side inputs of the damage step.
#[derive(Clone, Copy)]
pub struct DamageContext<'a> {
    pub attacker: EntityId,
    pub position: Vec3,
    pub yaw: f32,
    pub weapon: Option<&'a WeaponData>,
    pub hit_origin_height: f32,
    pub hits: &'a dyn HitScanOracle,
}

/// Run one tick of damage aggregation.
///
/// `params` are the animation parameters after this tick's animation and
/// attack steps; `events` are the animation events raised this tick.
pub fn run_damage_step(
    prev: &DamageState,
    params: &ParamTable,
    events: &[AnimationEvent],
    ctx: &DamageContext<'_>,
) -> (DamageState, Vec<DamageEvent>) {
    let mut next = prev.clone();
    let mut committed = Vec::new();

    if params.flag(Param::CanDealMeleeDamage) {
        collect(&mut next, params.id(Param::AttackId), ctx);
    }

    for event in events.iter().filter(|e| e.is_damage_signal()) {
        match event {
            AnimationEvent::ReachedDamageFrame => {
                let Some(weapon) = ctx.weapon else {
                    next.pending.clear();
                    continue;
                };
                committed.extend(std::mem::take(&mut next.pending).into_iter().map(
                    |(target, amount)| DamageEvent {
                        attacker: ctx.attacker,
                        target,
                        amount,
                        take_damage_id: weapon.take_damage_front_id,
                    },
                ));
            }
            AnimationEvent::Interrupted => {
                if !next.pending.is_empty() {
                    tracing::debug!(attacker = %ctx.attacker, dropped = next.pending.len(), "attack interrupted");
                }
                next.pending.clear();
            }
            _ => {}
        }
    }

    for hit in &committed {
        tracing::debug!(attacker = %hit.attacker, target = %hit.target, amount = hit.amount, "damage committed");
    }
    (next, committed)
}

fn collect(state: &mut DamageState, attack_id: i32, ctx: &DamageContext<'_>) {
    let Some(weapon) = ctx.weapon else {
        return;
    };
    let origin = ctx.position + Vec3::UP * ctx.hit_origin_height;
    let direction = forward_from_yaw(ctx.yaw);
    let amount = weapon.damage_for(attack_id);

    for target in ctx
        .hits
        .scan(ctx.attacker, origin, direction, weapon.reach, LayerMask::PLAYER)
    {
        if target == ctx.attacker {
            continue;
        }
        state.pending.entry(target).or_insert(amount);
    }
}

// ---------------------------------------------------------------------------
// Hazards
// ---------------------------------------------------------------------------

/// Damage dealt by a hazard unless configured otherwise.
pub const HAZARD_DAMAGE: u32 = 10;

/// A static damage volume: a vertical column around `center`. An entity is
/// hit once each time it enters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hazard {
    pub center: Vec3,
    pub radius: f32,
    pub damage: u32,
}

impl Hazard {
    /// A hazard dealing [`HAZARD_DAMAGE`].
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            damage: HAZARD_DAMAGE,
        }
    }

    /// Override the damage dealt.
    pub fn with_damage(mut self, damage: u32) -> Self {
        self.damage = damage;
        self
    }

    pub fn contains(&self, position: Vec3) -> bool {
        (position - self.center).horizontal_length() <= self.radius
    }

    /// Whether moving from `from` to `to` crosses into the volume.
    pub fn entered(&self, from: Vec3, to: Vec3) -> bool {
        !self.contains(from) && self.contains(to)
    }
}

/// Hits on `target` from every hazard it entered while moving from `from`
/// to `to`. The attacker is [`EntityId::ENVIRONMENT`].
pub fn hazard_hits(
    hazards: &[Hazard],
    target: EntityId,
    from: Vec3,
    to: Vec3,
    take_damage_id: i32,
) -> Vec<DamageEvent> {
    hazards
        .iter()
        .filter(|hazard| hazard.entered(from, to))
        .map(|hazard| {
            tracing::debug!(%target, amount = hazard.damage, "hazard entered");
            DamageEvent {
                attacker: EntityId::ENVIRONMENT,
                target,
                amount: hazard.damage,
                take_damage_id,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// HealthLedger
// ---------------------------------------------------------------------------

/// A health value that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthChange {
    pub entity: EntityId,
    pub previous: u32,
    pub current: u32,
}

/// Authority-owned health of every entity, clamped to `[0, max]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthLedger {
    max: u32,
    health: BTreeMap<EntityId, u32>,
}

impl HealthLedger {
    /// An empty ledger whose entities spawn at `max` health.
    pub fn new(max: u32) -> Self {
        Self {
            max,
            health: BTreeMap::new(),
        }
    }

    /// Track `entity` at full health.
    pub fn spawn(&mut self, entity: EntityId) {
        self.health.insert(entity, self.max);
    }

    /// Stop tracking `entity`.
    pub fn despawn(&mut self, entity: EntityId) -> Option<u32> {
        self.health.remove(&entity)
    }

    /// Current health of `entity`.
    pub fn health(&self, entity: EntityId) -> Option<u32> {
        self.health.get(&entity).copied()
    }

    /// Upper clamp.
    pub fn max(&self) -> u32 {
        self.max
    }

    /// Set health directly, clamped to `[0, max]`.
    pub fn set(&mut self, entity: EntityId, health: u32) -> Option<HealthChange> {
        let slot = self.health.get_mut(&entity)?;
        let previous = *slot;
        *slot = health.min(self.max);
        (previous != *slot).then_some(HealthChange {
            entity,
            previous,
            current: *slot,
        })
    }

    /// Apply a committed hit. Hits on untracked entities are logged and
    /// ignored. Returns the change, if health moved.
    pub fn apply(&mut self, hit: &DamageEvent) -> Option<HealthChange> {
        let Some(current) = self.health(hit.target) else {
            tracing::warn!(target = %hit.target, "damage for untracked entity, ignoring");
            return None;
        };
        self.set(hit.target, current.saturating_sub(hit.amount))
    }

    /// Tracked entities and their health, in id order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, u32)> + '_ {
        self.health.iter().map(|(e, h)| (*e, *h))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
