//! The per-process session driver.
//!
//! A [`Participant`] is one process in a session: the host or a client. It
//! owns a [`TickClock`] and one [`EntitySimulator`] per entity, each driven
//! according to the entity's [`Role`] on this participant:
//!
//! - **Authority** (host): simulates the entity from its owner's queued
//!   inputs, relays the inputs and broadcasts the resulting state, and is the
//!   only place damage, parries and weapon switches take effect.
//! - **Owner** (the controlling client): samples local input and predicts
//!   immediately, then reconciles against the broadcast state. Every input
//!   it sends reports how far it runs ahead of the authority.
//! - **Observer** (every other client): extrapolates the entity with its last
//!   relayed input on a virtual tick that leads the authority by the owner's
//!   reported lead, and reconciles the same way.
//!
//! Every tick runs in a fixed order. First a [`SessionWorld`] is captured from
//! all entity states. Then the entities are stepped in id order against it.
//! Last, the authority resolves combat. Since all entities read the same
//! captured world, the result does not depend on the order they are stepped
//! in.
//!
//! Participants communicate only through [`NetMessage`]s: outgoing messages
//! accumulate in an outbox and incoming ones are handed to
//! [`receive`](Participant::receive).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use riposte_core::config::SimConfig;
use riposte_core::ids::{EntityId, LayerMask, Tick, SPAWN_TICK};
use riposte_core::input::InputSnapshot;
use riposte_core::math::Vec3;
use riposte_core::state::StateSnapshot;
use riposte_core::weapon::{WeaponCatalog, WeaponName, TAKE_DAMAGE_IDS};
use riposte_sim::attack::ParryEvent;
use riposte_sim::clock::TickClock;
use riposte_sim::damage::{hazard_hits, DamageEvent, Hazard, HealthLedger};
use riposte_sim::oracle::stub::FlatGround;
use riposte_sim::oracle::{
    GroundOracle, HitScanOracle, InputSampler, MotionResolver, Oracles, ParryOracle,
};
use riposte_sim::pipeline::{EntitySimulator, Reaction, StepMode};

use crate::authority::{InputQueue, QueueStats};
use crate::extrapolate::RemoteExtrapolator;
use crate::history::HistoryBuffer;
use crate::message::NetMessage;
use crate::reconcile::{
    AuthoritativeSlot, ReconcileConfig, ReconcileOutcome, ReconcileStats, ReconciliationEngine,
};
use crate::ReconcileError;

/// Radius of a player's hurt volume around its position.
pub const HURT_RADIUS: f32 = 0.5;

// ---------------------------------------------------------------------------
// SessionWorld
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
struct Body {
    position: Vec3,
    can_be_parried: bool,
}

/// The collaborators a participant's entities see during one tick: a flat
/// floor plus every entity's position and parry window as of the start of
/// the tick.
#[derive(Debug, Clone)]
pub struct SessionWorld {
    floor: FlatGround,
    bodies: BTreeMap<EntityId, Body>,
}

impl SessionWorld {
    /// A world with only a floor.
    pub fn new(floor: FlatGround) -> Self {
        Self {
            floor,
            bodies: BTreeMap::new(),
        }
    }

    /// Snapshot `states` on top of `floor`.
    pub fn capture<'a>(
        floor: FlatGround,
        states: impl IntoIterator<Item = (EntityId, &'a StateSnapshot)>,
    ) -> Self {
        let bodies = states
            .into_iter()
            .map(|(entity, state)| {
                let body = Body {
                    position: state.position(),
                    can_be_parried: state.animation.params.can_be_parried,
                };
                (entity, body)
            })
            .collect();
        Self { floor, bodies }
    }

    /// Borrow as an [`Oracles`] bundle.
    pub fn oracles(&self) -> Oracles<'_> {
        Oracles {
            ground: self,
            hits: self,
            parry: self,
            motion: self,
        }
    }
}

impl GroundOracle for SessionWorld {
    fn check_sphere(&self, center: Vec3, radius: f32, mask: LayerMask) -> bool {
        self.floor.check_sphere(center, radius, mask)
    }
}

impl MotionResolver for SessionWorld {
    fn resolve(&self, entity: EntityId, from: Vec3, displacement: Vec3) -> Vec3 {
        self.floor.resolve(entity, from, displacement)
    }
}

impl HitScanOracle for SessionWorld {
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
        self.bodies
            .iter()
            .filter(|(entity, _)| **entity != attacker)
            .filter(|(_, body)| {
                let to = body.position - origin;
                let ahead = to.x * direction.x + to.z * direction.z;
                ahead >= 0.0 && to.horizontal_length() <= range + HURT_RADIUS
            })
            .map(|(entity, _)| *entity)
            .collect()
    }
}

impl ParryOracle for SessionWorld {
    fn nearest_parryable(&self, entity: EntityId, center: Vec3, radius: f32) -> Option<EntityId> {
        let mut nearest: Option<(EntityId, f32)> = None;
        for (other, body) in &self.bodies {
            if *other == entity || !body.can_be_parried {
                continue;
            }
            let distance = center.distance(body.position + Vec3::UP);
            if distance > radius {
                continue;
            }
            if nearest.map_or(true, |(_, best)| distance < best) {
                nearest = Some((*other, distance));
            }
        }
        nearest.map(|(other, _)| other)
    }
}

// ---------------------------------------------------------------------------
// Role / reports
// ---------------------------------------------------------------------------

/// How this participant drives an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Authority,
    Owner,
    Observer,
}

/// A combat reaction announced by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CombatNotice {
    Hit { entity: EntityId, take_damage_id: i32 },
    Parried { entity: EntityId, parry_id: i32 },
}

/// What one participant tick did.
#[derive(Debug, Clone, Default)]
pub struct ParticipantTick {
    /// The participant's clock tick.
    pub tick: Tick,
    /// Entities stepped this tick and the last entity tick simulated.
    pub simulated: Vec<(EntityId, Tick)>,
    /// Reconciliation passes that compared or corrected state.
    pub reconciled: Vec<(EntityId, ReconcileOutcome)>,
    /// Reconciliation failures.
    pub errors: Vec<(EntityId, ReconcileError)>,
    /// Hits committed by authoritative entities.
    pub damage: Vec<DamageEvent>,
    /// Parries performed by authoritative entities.
    pub parries: Vec<ParryEvent>,
}

// ---------------------------------------------------------------------------
// Entity drivers
// ---------------------------------------------------------------------------

/// History, reconciliation and the authoritative slot of a predicted or
/// extrapolated entity.
struct Prediction {
    history: HistoryBuffer,
    engine: ReconciliationEngine,
    authoritative: AuthoritativeSlot,
}

impl Prediction {
    fn new(config: &SimConfig, spawn: &StateSnapshot) -> Self {
        let mut history = HistoryBuffer::new(config.net.history_capacity);
        history.record(SPAWN_TICK, InputSnapshot::idle(), spawn.clone());
        Self {
            history,
            engine: ReconciliationEngine::new(ReconcileConfig::from(&config.net)),
            authoritative: AuthoritativeSlot::new(),
        }
    }

    fn reconcile(
        &mut self,
        sim: &mut EntitySimulator,
        next_tick: Tick,
        fallback_input: &InputSnapshot,
        oracles: &Oracles<'_>,
        report: &mut ParticipantTick,
    ) {
        let entity = sim.entity();
        let result = self.engine.reconcile(
            sim,
            &mut self.history,
            self.authoritative.latest(),
            next_tick,
            fallback_input,
            oracles,
        );
        match result {
            Ok(ReconcileOutcome::NoAuthority | ReconcileOutcome::AlreadyChecked) => {}
            Ok(outcome) => report.reconciled.push((entity, outcome)),
            Err(err) => report.errors.push((entity, err)),
        }
    }

    fn step(
        &mut self,
        sim: &mut EntitySimulator,
        tick: Tick,
        input: InputSnapshot,
        oracles: &Oracles<'_>,
    ) {
        let out = sim.step(tick, &input, oracles, StepMode::Live);
        self.history.record(tick, input, out.state);
    }
}

enum Driver {
    Authority {
        queue: InputQueue,
        /// Newest lead the owner reported, with the input tick it came on.
        owner_lead: (Tick, u64),
    },
    Owner {
        sampler: Box<dyn InputSampler>,
        prediction: Prediction,
    },
    Observer {
        extrapolator: RemoteExtrapolator,
        prediction: Prediction,
    },
}

impl Driver {
    fn role(&self) -> Role {
        match self {
            Driver::Authority { .. } => Role::Authority,
            Driver::Owner { .. } => Role::Owner,
            Driver::Observer { .. } => Role::Observer,
        }
    }

    fn prediction(&self) -> Option<&Prediction> {
        match self {
            Driver::Authority { .. } => None,
            Driver::Owner { prediction, .. } | Driver::Observer { prediction, .. } => {
                Some(prediction)
            }
        }
    }
}

struct EntitySlot {
    sim: EntitySimulator,
    driver: Driver,
}

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// One process of a session.
///
/// Entities start at [`SPAWN_TICK`] and should be spawned before the first
/// tick. An entity's ticks follow its owner's clock.
pub struct Participant {
    config: SimConfig,
    catalog: WeaponCatalog,
    clock: TickClock,
    floor: FlatGround,
    entities: BTreeMap<EntityId, EntitySlot>,
    health: HealthLedger,
    hazards: Vec<Hazard>,
    outbox: Vec<NetMessage>,
    notices: Vec<CombatNotice>,
}

impl Participant {
    /// A participant with no entities, on a floor at height 0.
    pub fn new(config: &SimConfig, catalog: &WeaponCatalog) -> Self {
        Self {
            config: config.clone(),
            catalog: catalog.clone(),
            clock: TickClock::new(config.tick_rate_hz),
            floor: FlatGround::at(0.0),
            entities: BTreeMap::new(),
            health: HealthLedger::new(config.combat.max_health),
            hazards: Vec::new(),
            outbox: Vec::new(),
            notices: Vec::new(),
        }
    }

    /// Replace the floor.
    pub fn with_floor(mut self, floor: FlatGround) -> Self {
        self.floor = floor;
        self
    }

    // -- spawning -----------------------------------------------------------

    /// Simulate `entity` authoritatively from its owner's inputs.
    pub fn spawn_authoritative(&mut self, entity: EntityId, spawn: StateSnapshot, weapon: WeaponName) {
        let queue = InputQueue::new(SPAWN_TICK, self.config.net.max_input_queue);
        self.insert(entity, spawn, weapon, |_, _| Driver::Authority {
            queue,
            owner_lead: (SPAWN_TICK, 0),
        });
    }

    /// Control `entity` locally with input from `sampler`.
    pub fn spawn_owned(
        &mut self,
        entity: EntityId,
        spawn: StateSnapshot,
        weapon: WeaponName,
        sampler: Box<dyn InputSampler>,
    ) {
        self.insert(entity, spawn, weapon, |config, state| Driver::Owner {
            sampler,
            prediction: Prediction::new(config, state),
        });
    }

    /// Extrapolate `entity` from relayed inputs.
    pub fn spawn_observed(&mut self, entity: EntityId, spawn: StateSnapshot, weapon: WeaponName) {
        let lead_threshold = self.config.net.lead_threshold;
        self.insert(entity, spawn, weapon, |config, state| Driver::Observer {
            extrapolator: RemoteExtrapolator::new(lead_threshold),
            prediction: Prediction::new(config, state),
        });
    }

    fn insert(
        &mut self,
        entity: EntityId,
        spawn: StateSnapshot,
        weapon: WeaponName,
        driver: impl FnOnce(&SimConfig, &StateSnapshot) -> Driver,
    ) {
        let mut sim = EntitySimulator::new(entity, &self.config, spawn);
        sim.equip(weapon, &self.catalog);
        let driver = driver(&self.config, sim.state());
        tracing::info!(%entity, role = ?driver.role(), ?weapon, "entity spawned");
        self.health.spawn(entity);
        if self.entities.insert(entity, EntitySlot { sim, driver }).is_some() {
            tracing::warn!(%entity, "entity respawned, previous simulation replaced");
        }
    }

    /// Add a damage volume. Only the authority applies hazard damage.
    pub fn add_hazard(&mut self, hazard: Hazard) {
        self.hazards.push(hazard);
    }

    /// Stop simulating `entity`. Returns `false` if it was unknown.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        self.health.despawn(entity);
        self.entities.remove(&entity).is_some()
    }

    // -- messaging ----------------------------------------------------------

    /// Handle an incoming message.
    pub fn receive(&mut self, message: NetMessage) {
        tracing::trace!(kind = message.kind(), entity = %message.entity(), "receive");
        match message {
            NetMessage::SendInput {
                entity,
                tick,
                input,
                lead,
            } => {
                match self.entities.get_mut(&entity).map(|slot| &mut slot.driver) {
                    Some(Driver::Authority { queue, owner_lead }) => {
                        queue.push(tick, input);
                        if tick > owner_lead.0 {
                            *owner_lead = (tick, lead);
                        }
                    }
                    _ => {
                        tracing::warn!(%entity, tick, "input for an entity not simulated authoritatively here");
                    }
                }
            }
            NetMessage::RelayInput {
                entity,
                tick,
                input,
                lead,
            } => {
                if let Some(Driver::Observer { extrapolator, .. }) =
                    self.entities.get_mut(&entity).map(|slot| &mut slot.driver)
                {
                    extrapolator.observe_relay(tick, input, lead);
                }
            }
            NetMessage::BroadcastState { entity, tick, state } => {
                match self.entities.get_mut(&entity).map(|slot| &mut slot.driver) {
                    Some(Driver::Owner { prediction, .. }) => {
                        prediction.authoritative.offer(tick, state);
                    }
                    Some(Driver::Observer {
                        extrapolator,
                        prediction,
                    }) => {
                        if prediction.authoritative.offer(tick, state) {
                            extrapolator.observe_authoritative(tick);
                        }
                    }
                    Some(Driver::Authority { .. }) => {}
                    None => tracing::warn!(%entity, tick, "state for unknown entity"),
                }
            }
            NetMessage::HealthChanged { entity, health } => {
                if self.role(entity) != Some(Role::Authority) {
                    self.health.set(entity, health);
                }
            }
            NetMessage::HitReaction {
                entity,
                take_damage_id,
            } => {
                if self.role(entity) != Some(Role::Authority) {
                    self.notices.push(CombatNotice::Hit {
                        entity,
                        take_damage_id,
                    });
                }
            }
            NetMessage::Parried { entity, parry_id } => {
                if self.role(entity) != Some(Role::Authority) {
                    self.notices.push(CombatNotice::Parried { entity, parry_id });
                }
            }
            NetMessage::SwitchWeapon { entity, weapon } => {
                if self.role(entity) == Some(Role::Authority) {
                    self.apply_switch(entity, weapon);
                } else {
                    tracing::warn!(%entity, ?weapon, "weapon switch for an entity not simulated authoritatively here");
                }
            }
            NetMessage::WeaponChanged { entity, weapon } => {
                let Some(slot) = self.entities.get_mut(&entity) else {
                    return;
                };
                if slot.driver.role() != Role::Authority && slot.sim.weapon_name() != weapon {
                    tracing::debug!(%entity, from = ?slot.sim.weapon_name(), to = ?weapon, "weapon changed");
                    slot.sim.equip(weapon, &self.catalog);
                }
            }
        }
    }

    // -- weapons ------------------------------------------------------------

    /// Switch the weapon of an owned or authoritative entity.
    ///
    /// Refused while the entity is attacking or already holds `weapon`. An
    /// owner equips immediately and asks the authority, which may still
    /// refuse and send back the weapon it kept. Returns whether the switch
    /// was made locally.
    pub fn switch_weapon(&mut self, entity: EntityId, weapon: WeaponName) -> bool {
        match self.role(entity) {
            Some(Role::Authority) => self.apply_switch(entity, weapon),
            Some(Role::Owner) => {
                if !self.equip_unless_attacking(entity, weapon) {
                    return false;
                }
                self.outbox.push(NetMessage::SwitchWeapon { entity, weapon });
                true
            }
            Some(Role::Observer) | None => {
                tracing::warn!(%entity, ?weapon, "weapon switch for an entity not controlled here");
                false
            }
        }
    }

    /// Authority side of a switch: equip unless attacking, then broadcast
    /// the weapon held either way.
    fn apply_switch(&mut self, entity: EntityId, weapon: WeaponName) -> bool {
        let switched = self.equip_unless_attacking(entity, weapon);
        if let Some(slot) = self.entities.get(&entity) {
            self.outbox.push(NetMessage::WeaponChanged {
                entity,
                weapon: slot.sim.weapon_name(),
            });
        }
        switched
    }

    fn equip_unless_attacking(&mut self, entity: EntityId, weapon: WeaponName) -> bool {
        let Some(slot) = self.entities.get_mut(&entity) else {
            return false;
        };
        if slot.sim.weapon_name() == weapon {
            return false;
        }
        if slot.sim.state().animation.params.attacking {
            tracing::warn!(%entity, ?weapon, "weapon switch refused while attacking");
            return false;
        }
        tracing::info!(%entity, from = ?slot.sim.weapon_name(), to = ?weapon, "weapon switched");
        slot.sim.equip(weapon, &self.catalog);
        true
    }

    /// Take every message produced since the last call.
    pub fn drain_outbox(&mut self) -> Vec<NetMessage> {
        std::mem::take(&mut self.outbox)
    }

    /// Take every combat notice produced or received since the last call.
    pub fn drain_notices(&mut self) -> Vec<CombatNotice> {
        std::mem::take(&mut self.notices)
    }

    // -- ticking ------------------------------------------------------------

    /// Advance the clock by a frame delta and run every tick that became
    /// due.
    pub fn advance(&mut self, delta: Duration) -> Vec<ParticipantTick> {
        self.clock
            .advance(delta)
            .into_iter()
            .map(|tick| self.run_tick(tick))
            .collect()
    }

    /// Advance the clock by exactly one period. Returns `None` while paused.
    pub fn tick_once(&mut self) -> Option<ParticipantTick> {
        let period = self.clock.period();
        self.advance(period).pop()
    }

    /// Stop ticking.
    pub fn pause(&mut self) {
        self.clock.pause();
    }

    /// Resume ticking.
    pub fn resume(&mut self) {
        self.clock.resume();
    }

    fn run_tick(&mut self, tick: Tick) -> ParticipantTick {
        let world = SessionWorld::capture(
            self.floor,
            self.entities
                .iter()
                .map(|(entity, slot)| (*entity, slot.sim.state())),
        );
        let oracles = world.oracles();
        let mut report = ParticipantTick {
            tick,
            ..ParticipantTick::default()
        };

        for (&entity, slot) in self.entities.iter_mut() {
            let sim = &mut slot.sim;
            match &mut slot.driver {
                Driver::Authority { queue, owner_lead } => {
                    let batch = queue.drain();
                    let Some(last) = batch.last().copied() else {
                        continue;
                    };
                    for queued in &batch {
                        let from = sim.state().position();
                        let out = sim.step(queued.tick, &queued.input, &oracles, StepMode::Live);
                        report.damage.extend(out.damage);
                        report.parries.extend(out.parries);
                        let take_damage_id = sim
                            .weapon()
                            .map_or(TAKE_DAMAGE_IDS[0], |weapon| weapon.take_damage_front_id);
                        report.damage.extend(hazard_hits(
                            &self.hazards,
                            entity,
                            from,
                            out.state.position(),
                            take_damage_id,
                        ));
                    }
                    report.simulated.push((entity, last.tick));
                    self.outbox.push(NetMessage::RelayInput {
                        entity,
                        tick: last.tick,
                        input: last.input,
                        lead: owner_lead.1,
                    });
                    self.outbox.push(NetMessage::BroadcastState {
                        entity,
                        tick: last.tick,
                        state: sim.state().clone(),
                    });
                }
                Driver::Owner {
                    sampler,
                    prediction,
                } => {
                    prediction.reconcile(sim, tick, &InputSnapshot::idle(), &oracles, &mut report);
                    let input = sampler.sample(tick);
                    prediction.step(sim, tick, input, &oracles);
                    report.simulated.push((entity, tick));
                    let lead = prediction
                        .authoritative
                        .tick()
                        .map_or(0, |confirmed| tick.saturating_sub(confirmed));
                    self.outbox.push(NetMessage::SendInput {
                        entity,
                        tick,
                        input,
                        lead,
                    });
                }
                Driver::Observer {
                    extrapolator,
                    prediction,
                } => {
                    let Some(virtual_tick) = extrapolator.advance() else {
                        continue;
                    };
                    if extrapolator.take_force() {
                        prediction.engine.request_force();
                    }
                    let input = extrapolator.input();
                    prediction.reconcile(sim, virtual_tick, &input, &oracles, &mut report);
                    prediction.step(sim, virtual_tick, input, &oracles);
                    report.simulated.push((entity, virtual_tick));
                }
            }
        }

        self.resolve_combat(&report);
        tracing::trace!(tick, simulated = report.simulated.len(), "participant tick");
        report
    }

    /// Apply the authority's committed hits and parries.
    fn resolve_combat(&mut self, report: &ParticipantTick) {
        for hit in &report.damage {
            if let Some(change) = self.health.apply(hit) {
                self.outbox.push(NetMessage::HealthChanged {
                    entity: change.entity,
                    health: change.current,
                });
            }
            let Some(target) = self.entities.get_mut(&hit.target) else {
                continue;
            };
            target.sim.queue_reaction(Reaction::TakeDamage {
                take_damage_id: hit.take_damage_id,
            });
            self.outbox.push(NetMessage::HitReaction {
                entity: hit.target,
                take_damage_id: hit.take_damage_id,
            });
            self.notices.push(CombatNotice::Hit {
                entity: hit.target,
                take_damage_id: hit.take_damage_id,
            });
        }

        for parry in &report.parries {
            let Some(target) = self.entities.get_mut(&parry.target) else {
                continue;
            };
            target.sim.queue_reaction(Reaction::GetParried);
            let Some(parry_id) = target.sim.weapon().map(|weapon| weapon.get_parried_id) else {
                continue;
            };
            self.outbox.push(NetMessage::Parried {
                entity: parry.target,
                parry_id,
            });
            self.notices.push(CombatNotice::Parried {
                entity: parry.target,
                parry_id,
            });
        }
    }

    // -- accessors ----------------------------------------------------------

    /// The last tick the clock emitted.
    pub fn current_tick(&self) -> Tick {
        self.clock.current_tick()
    }

    /// Entities on this participant, in id order.
    pub fn entities(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// How `entity` is driven here.
    pub fn role(&self, entity: EntityId) -> Option<Role> {
        self.entities.get(&entity).map(|slot| slot.driver.role())
    }

    /// Current state of `entity`.
    pub fn state(&self, entity: EntityId) -> Option<&StateSnapshot> {
        self.entities.get(&entity).map(|slot| slot.sim.state())
    }

    /// The simulator of `entity`.
    pub fn simulator(&self, entity: EntityId) -> Option<&EntitySimulator> {
        self.entities.get(&entity).map(|slot| &slot.sim)
    }

    /// Health of `entity`: authoritative on the host, mirrored elsewhere.
    pub fn health(&self, entity: EntityId) -> Option<u32> {
        self.health.health(entity)
    }

    /// History of a predicted or extrapolated entity.
    pub fn history(&self, entity: EntityId) -> Option<&HistoryBuffer> {
        let slot = self.entities.get(&entity)?;
        slot.driver.prediction().map(|prediction| &prediction.history)
    }

    /// Reconciliation counters of a predicted or extrapolated entity.
    pub fn reconcile_stats(&self, entity: EntityId) -> Option<&ReconcileStats> {
        let slot = self.entities.get(&entity)?;
        slot.driver.prediction().map(|prediction| prediction.engine.stats())
    }

    /// Tick of the newest authoritative snapshot held for `entity`.
    pub fn authoritative_tick(&self, entity: EntityId) -> Option<Tick> {
        let slot = self.entities.get(&entity)?;
        slot.driver
            .prediction()
            .and_then(|prediction| prediction.authoritative.tick())
    }

    /// Input queue counters of an authoritative entity.
    pub fn queue_stats(&self, entity: EntityId) -> Option<&QueueStats> {
        match &self.entities.get(&entity)?.driver {
            Driver::Authority { queue, .. } => Some(queue.stats()),
            _ => None,
        }
    }

    /// Extrapolation state of an observed entity.
    pub fn extrapolator(&self, entity: EntityId) -> Option<&RemoteExtrapolator> {
        match &self.entities.get(&entity)?.driver {
            Driver::Observer { extrapolator, .. } => Some(extrapolator),
            _ => None,
        }
    }

    /// Hazards applied by this participant.
    pub fn hazards(&self) -> &[Hazard] {
        &self.hazards
    }

    /// Shared configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
