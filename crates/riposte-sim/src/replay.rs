//! Deterministic replay of a single entity with checkpoint verification.
//!
//! The replay system records [`InputSnapshot`]s and periodic state digest
//! checkpoints while an [`EntitySimulator`] runs, producing a [`ReplayLog`].
//! The log can then be replayed against a fresh simulator to verify
//! determinism: replay restores the initial state, feeds the recorded inputs
//! tick by tick, and compares digests at each checkpoint.
//!
//! Authority-issued reactions are not part of the log. Replay runs in
//! [`StepMode::Resimulate`], so a log recorded on an entity that received
//! reactions will diverge at the first reacted tick.
//!
//! # Recording
//!
//! ```
//! use riposte_core::prelude::*;
//! use riposte_sim::prelude::*;
//! use riposte_sim::oracle::stub::Headless;
//!
//! let config = SimConfig::default();
//! let spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
//! let mut sim = EntitySimulator::new(EntityId::new(1), &config, spawn);
//! let world = Headless::default();
//!
//! let mut recorder = ReplayRecorder::new(&sim, 10);
//! for tick in 1..=60 {
//!     let input = InputSnapshot::moving(Vec2::new(0.0, 1.0), false);
//!     recorder.record_tick(tick, &input, Some(sim.state().digest()));
//!     sim.step(tick, &input, &world.oracles(), StepMode::Resimulate);
//! }
//! let log = recorder.finish();
//!
//! let spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
//! let mut fresh = EntitySimulator::new(EntityId::new(1), &config, spawn);
//! let result = replay(&mut fresh, &log, &WeaponCatalog::default(), &world.oracles()).unwrap();
//! assert!(result.completed);
//! assert!(result.first_divergence.is_none());
//! assert_eq!(fresh.state(), sim.state());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use riposte_core::ids::{EntityId, Tick};
use riposte_core::input::InputSnapshot;
use riposte_core::state::StateSnapshot;
use riposte_core::weapon::{WeaponCatalog, WeaponName};

use crate::oracle::Oracles;
use crate::pipeline::{EntitySimulator, StepMode};

// ---------------------------------------------------------------------------
// ReplayLog
// ---------------------------------------------------------------------------

/// A complete replay log: initial state plus an ordered sequence of inputs
/// and checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    /// The recorded entity.
    pub entity: EntityId,
    /// Weapon equipped during recording.
    pub weapon: WeaponName,
    /// Tick of `initial_state`. The first replayed tick is the next one.
    pub initial_tick: Tick,
    /// State the recording started from.
    pub initial_state: StateSnapshot,
    /// Number of ticks recorded.
    pub total_ticks: u64,
    /// Inputs and checkpoints in recording order.
    pub entries: Vec<ReplayEntry>,
}

impl ReplayLog {
    /// Serialize to JSON for storage or regression fixtures.
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a log previously written by [`to_json_string`](Self::to_json_string).
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ---------------------------------------------------------------------------
// ReplayEntry
// ---------------------------------------------------------------------------

/// A single entry in a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReplayEntry {
    /// A non-idle input for the given tick. Ticks without an entry replay
    /// idle input.
    Input { tick: Tick, input: InputSnapshot },
    /// The state digest observed right before the given tick was simulated.
    Checkpoint { tick: Tick, state_hash: String },
}

// ---------------------------------------------------------------------------
// ReplayResult
// ---------------------------------------------------------------------------

/// The outcome of replaying a [`ReplayLog`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayResult {
    /// Whether every recorded tick was replayed without divergence.
    pub completed: bool,
    /// Ticks replayed before stopping.
    pub ticks_replayed: u64,
    /// The first checkpoint whose digest did not match.
    pub first_divergence: Option<ReplayDivergence>,
}

/// Details about a determinism failure detected during replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayDivergence {
    pub tick: Tick,
    pub expected_hash: String,
    pub actual_hash: String,
}

// ---------------------------------------------------------------------------
// ReplayRecorder
// ---------------------------------------------------------------------------

/// Records an entity's run into a [`ReplayLog`].
///
/// Call [`record_tick`](Self::record_tick) before each step. Ticks must be
/// recorded in strictly increasing order.
#[derive(Debug)]
pub struct ReplayRecorder {
    log: ReplayLog,
    checkpoint_interval: u64,
    ticks_recorded: u64,
    last_tick: Option<Tick>,
}

impl ReplayRecorder {
    /// Start recording from the simulator's current state.
    ///
    /// A `checkpoint_interval` of 10 keeps digests for ticks 10, 20, ...; 0
    /// keeps every digest passed to [`record_tick`](Self::record_tick).
    pub fn new(sim: &EntitySimulator, checkpoint_interval: u64) -> Self {
        Self {
            log: ReplayLog {
                entity: sim.entity(),
                weapon: sim.weapon_name(),
                initial_tick: sim.tick(),
                initial_state: sim.state().clone(),
                total_ticks: 0,
                entries: Vec::new(),
            },
            checkpoint_interval,
            ticks_recorded: 0,
            last_tick: None,
        }
    }

    /// Record the input for `tick` and, on the checkpoint interval, the
    /// digest of the state the tick starts from.
    ///
    /// # Panics
    ///
    /// Panics if `tick` is not strictly greater than the previously recorded
    /// tick.
    pub fn record_tick(&mut self, tick: Tick, input: &InputSnapshot, state_hash: Option<String>) {
        if let Some(prev) = self.last_tick {
            assert!(
                tick > prev,
                "ReplayRecorder::record_tick: tick {tick} is not strictly greater than previous tick {prev}"
            );
        }
        self.last_tick = Some(tick);
        self.ticks_recorded += 1;

        if *input != InputSnapshot::idle() {
            self.log.entries.push(ReplayEntry::Input { tick, input: *input });
        }

        if let Some(hash) = state_hash {
            let should_checkpoint =
                self.checkpoint_interval == 0 || tick % self.checkpoint_interval == 0;
            if should_checkpoint {
                self.log.entries.push(ReplayEntry::Checkpoint {
                    tick,
                    state_hash: hash,
                });
            }
        }
    }

    /// Finish recording and return the log.
    pub fn finish(mut self) -> ReplayLog {
        self.log.total_ticks = self.ticks_recorded;
        self.log
    }
}

// ---------------------------------------------------------------------------
// replay()
// ---------------------------------------------------------------------------

/// Replay `log` on `sim`, verifying every checkpoint.
///
/// The log is validated before `sim` is touched: the entity must match, and
/// duplicate entries or an overflowing tick range are rejected. Replay stops
/// at the first divergence.
///
/// # Errors
///
/// Returns an error if the log is malformed or recorded for another entity.
/// On error the simulator is unmodified.
pub fn replay(
    sim: &mut EntitySimulator,
    log: &ReplayLog,
    catalog: &WeaponCatalog,
    oracles: &Oracles<'_>,
) -> Result<ReplayResult, anyhow::Error> {
    if sim.entity() != log.entity {
        return Err(anyhow::anyhow!(
            "replay log was recorded for entity {} but the simulator runs {}",
            log.entity,
            sim.entity()
        ));
    }

    let mut inputs: BTreeMap<Tick, InputSnapshot> = BTreeMap::new();
    let mut checkpoints: BTreeMap<Tick, &str> = BTreeMap::new();
    for entry in &log.entries {
        match entry {
            ReplayEntry::Input { tick, input } => {
                if inputs.insert(*tick, *input).is_some() {
                    return Err(anyhow::anyhow!(
                        "replay log contains duplicate Input entry at tick {tick}"
                    ));
                }
            }
            ReplayEntry::Checkpoint { tick, state_hash } => {
                if checkpoints.insert(*tick, state_hash.as_str()).is_some() {
                    return Err(anyhow::anyhow!(
                        "replay log contains duplicate Checkpoint entry at tick {tick}"
                    ));
                }
            }
        }
    }

    let first_tick = log.initial_tick.checked_add(1).ok_or_else(|| {
        anyhow::anyhow!("initial tick {} leaves no room to replay", log.initial_tick)
    })?;
    let end_tick = first_tick.checked_add(log.total_ticks).ok_or_else(|| {
        anyhow::anyhow!(
            "tick range overflow: initial tick ({}) + total ticks ({}) exceeds u64::MAX",
            log.initial_tick,
            log.total_ticks
        )
    })?;

    sim.force_set(log.initial_tick, &log.initial_state);
    sim.equip(log.weapon, catalog);

    let mut ticks_replayed = 0;
    for tick in first_tick..end_tick {
        if let Some(expected) = checkpoints.get(&tick) {
            let actual = sim.state().digest();
            if actual != *expected {
                tracing::debug!(tick, "replay diverged");
                return Ok(ReplayResult {
                    completed: false,
                    ticks_replayed,
                    first_divergence: Some(ReplayDivergence {
                        tick,
                        expected_hash: (*expected).to_owned(),
                        actual_hash: actual,
                    }),
                });
            }
        }

        let input = inputs.get(&tick).copied().unwrap_or_default();
        sim.step(tick, &input, oracles, StepMode::Resimulate);
        ticks_replayed += 1;
    }

    Ok(ReplayResult {
        completed: true,
        ticks_replayed,
        first_divergence: None,
    })
}
