//! Divergence detection and deterministic resimulation.
//!
//! Every participant that is not authoritative for an entity runs a
//! [`ReconciliationEngine`] at the start of each tick, before the new tick is
//! simulated. The engine compares the latest [`AuthoritativeSnapshot`]
//! against the state the participant recorded for the same tick. When they
//! disagree, the authoritative state replaces the recorded one and every
//! later tick is replayed from the buffered inputs in
//! [`StepMode::Resimulate`].
//!
//! The authoritative state always wins. There is no smoothing: the
//! simulator jumps to the corrected state in the same tick.
//!
//! A pass is a pure function of the history buffer and the authoritative
//! snapshot, so running it twice over the same data produces the same
//! state. A newer snapshot simply supersedes an older one on the next tick.

use serde::{Deserialize, Serialize};

use riposte_core::config::NetConfig;
use riposte_core::ids::Tick;
use riposte_core::input::InputSnapshot;
use riposte_core::math::delta_angle;
use riposte_core::state::StateSnapshot;
use riposte_sim::oracle::Oracles;
use riposte_sim::pipeline::{EntitySimulator, StepMode};

use crate::history::HistoryBuffer;
use crate::ReconcileError;

// ---------------------------------------------------------------------------
// AuthoritativeSnapshot / AuthoritativeSlot
// ---------------------------------------------------------------------------

/// A state broadcast by the authority for `tick`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthoritativeSnapshot {
    pub tick: Tick,
    pub state: StateSnapshot,
}

/// Holds the newest authoritative snapshot for one entity.
///
/// Last write by tick wins: a snapshot for a tick at or below the held one is
/// dropped, so reordered or duplicated broadcasts never move the slot
/// backwards.
#[derive(Debug, Clone, Default)]
pub struct AuthoritativeSlot {
    latest: Option<AuthoritativeSnapshot>,
    dropped: u64,
}

impl AuthoritativeSlot {
    /// An empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a snapshot. Returns `true` if it replaced the held one.
    pub fn offer(&mut self, tick: Tick, state: StateSnapshot) -> bool {
        if let Some(held) = &self.latest {
            if tick <= held.tick {
                self.dropped += 1;
                tracing::debug!(tick, held = held.tick, "stale authoritative snapshot dropped");
                return false;
            }
        }
        self.latest = Some(AuthoritativeSnapshot { tick, state });
        true
    }

    /// The held snapshot, if any has arrived.
    pub fn latest(&self) -> Option<&AuthoritativeSnapshot> {
        self.latest.as_ref()
    }

    /// Tick of the held snapshot.
    pub fn tick(&self) -> Option<Tick> {
        self.latest.as_ref().map(|snapshot| snapshot.tick)
    }

    /// Number of snapshots dropped as stale.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

// ---------------------------------------------------------------------------
// ReconcileConfig
// ---------------------------------------------------------------------------

/// Divergence thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Position error in metres.
    pub position_epsilon: f32,
    /// Yaw error in degrees.
    pub yaw_epsilon_degrees: f32,
    /// Half-width, in ticks, of the window searched for a matching clip.
    pub animation_tick_tolerance: u64,
}

impl From<&NetConfig> for ReconcileConfig {
    fn from(net: &NetConfig) -> Self {
        Self {
            position_epsilon: net.position_epsilon,
            yaw_epsilon_degrees: net.yaw_epsilon_degrees,
            animation_tick_tolerance: net.animation_tick_tolerance,
        }
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::from(&NetConfig::default())
    }
}

// ---------------------------------------------------------------------------
// DivergenceReason / ReconcileOutcome
// ---------------------------------------------------------------------------

/// Why a reconciliation pass resimulated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DivergenceReason {
    /// Positions are further apart than the epsilon.
    Position { error: f32 },
    /// Facings differ by more than the yaw epsilon.
    Yaw { error: f32 },
    /// The authoritative clip matches no buffered clip near the tick.
    Animation,
    /// The number of pending hits differs.
    PendingDamage { local: usize, authoritative: usize },
    /// A pass was requested regardless of the comparison.
    Forced,
    /// Nothing was ever recorded for the authoritative tick.
    Missing,
}

/// What a reconciliation pass did.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ReconcileOutcome {
    /// No authoritative snapshot has arrived yet.
    NoAuthority,
    /// The held snapshot was already checked and no pass was forced.
    AlreadyChecked,
    /// The snapshot is for a tick this participant has not simulated yet.
    AuthorityAhead { tick: Tick },
    /// The recorded state agreed with the authority.
    Converged { tick: Tick },
    /// The authoritative state was applied at `from` and ticks up to `to`
    /// (inclusive) were replayed. `to == from` when nothing needed replaying.
    Resimulated {
        from: Tick,
        to: Tick,
        reason: DivergenceReason,
    },
}

/// Counters kept across passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    /// Snapshots compared against history.
    pub checks: u64,
    /// Passes that found no divergence.
    pub converged: u64,
    /// Passes that resimulated.
    pub resimulations: u64,
    /// Ticks replayed over all resimulations.
    pub resimulated_ticks: u64,
    /// Snapshots that arrived after their tick left the history.
    pub evicted: u64,
}

// ---------------------------------------------------------------------------
// Divergence detection
// ---------------------------------------------------------------------------

/// Compare the state recorded for `tick` with the authoritative one.
///
/// The clip check accepts any clip recorded within
/// `animation_tick_tolerance` ticks of `tick`, so a transition the authority
/// took one tick earlier or later does not count as a divergence.
pub fn detect_divergence(
    history: &HistoryBuffer,
    tick: Tick,
    authoritative: &StateSnapshot,
    config: &ReconcileConfig,
) -> Option<DivergenceReason> {
    let Some(local) = history.state(tick) else {
        return Some(DivergenceReason::Missing);
    };

    let error = local.position().distance(authoritative.position());
    if error > config.position_epsilon {
        return Some(DivergenceReason::Position { error });
    }

    let error = delta_angle(local.yaw(), authoritative.yaw()).abs();
    if error > config.yaw_epsilon_degrees {
        return Some(DivergenceReason::Yaw { error });
    }

    let window = tick.saturating_sub(config.animation_tick_tolerance)
        ..=tick.saturating_add(config.animation_tick_tolerance);
    let clip_seen = window
        .filter_map(|t| history.state(t))
        .any(|state| state.animation.clip == authoritative.animation.clip);
    if !clip_seen {
        return Some(DivergenceReason::Animation);
    }

    let local_pending = local.damage.pending.len();
    let authoritative_pending = authoritative.damage.pending.len();
    if local_pending != authoritative_pending {
        return Some(DivergenceReason::PendingDamage {
            local: local_pending,
            authoritative: authoritative_pending,
        });
    }

    None
}

// ---------------------------------------------------------------------------
// ReconciliationEngine
// ---------------------------------------------------------------------------

/// Per-entity reconciliation driver.
#[derive(Debug, Clone, Default)]
pub struct ReconciliationEngine {
    config: ReconcileConfig,
    last_checked: Option<Tick>,
    /// Snapshot tick last found evicted; a pending force waits for a newer one.
    evicted: Option<Tick>,
    force: bool,
    stats: ReconcileStats,
}

impl ReconciliationEngine {
    /// Create an engine with the given thresholds.
    pub fn new(config: ReconcileConfig) -> Self {
        Self {
            config,
            last_checked: None,
            evicted: None,
            force: false,
            stats: ReconcileStats::default(),
        }
    }

    /// Resimulate on the next pass even if the states agree, and even if the
    /// held snapshot was already checked.
    pub fn request_force(&mut self) {
        self.force = true;
    }

    /// Whether a forced pass is pending.
    pub fn force_pending(&self) -> bool {
        self.force
    }

    /// Run one pass before simulating `next_tick`.
    ///
    /// `sim` must hold the state of `next_tick - 1`, and `history` the
    /// entries the simulator produced. Ticks whose input is missing from the
    /// history replay the previous tick's input; the authoritative tick
    /// itself falls back to `fallback_input`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::Evicted`] when the authoritative tick is no
    /// longer in the history. The snapshot is then marked as checked so the
    /// condition is reported once. A pending force survives and applies to
    /// the next snapshot that can be reconciled.
    pub fn reconcile(
        &mut self,
        sim: &mut EntitySimulator,
        history: &mut HistoryBuffer,
        authoritative: Option<&AuthoritativeSnapshot>,
        next_tick: Tick,
        fallback_input: &InputSnapshot,
        oracles: &Oracles<'_>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let Some(snapshot) = authoritative else {
            return Ok(ReconcileOutcome::NoAuthority);
        };
        let tick = snapshot.tick;

        if self.last_checked == Some(tick) && (!self.force || self.evicted == Some(tick)) {
            return Ok(ReconcileOutcome::AlreadyChecked);
        }
        if tick >= next_tick {
            tracing::trace!(entity = %sim.entity(), tick, next_tick, "authority ahead of local tick");
            return Ok(ReconcileOutcome::AuthorityAhead { tick });
        }

        self.last_checked = Some(tick);

        if history.is_evicted(tick) {
            self.evicted = Some(tick);
            self.stats.evicted += 1;
            let oldest = history.oldest_tick().unwrap_or(tick);
            tracing::warn!(
                entity = %sim.entity(),
                tick,
                oldest,
                "authoritative tick evicted from history, cannot reconcile"
            );
            return Err(ReconcileError::Evicted { tick, oldest });
        }

        let forced = std::mem::take(&mut self.force);
        self.stats.checks += 1;
        let reason = if forced {
            Some(DivergenceReason::Forced)
        } else {
            detect_divergence(history, tick, &snapshot.state, &self.config)
        };
        let Some(reason) = reason else {
            self.stats.converged += 1;
            return Ok(ReconcileOutcome::Converged { tick });
        };

        let mut input = history.input(tick).copied().unwrap_or(*fallback_input);
        history.record(tick, input, snapshot.state.clone());
        sim.force_set(tick, &snapshot.state);

        for replay_tick in tick + 1..next_tick {
            if let Some(recorded) = history.input(replay_tick) {
                input = *recorded;
            }
            let out = sim.step(replay_tick, &input, oracles, StepMode::Resimulate);
            history.record(replay_tick, input, out.state);
        }

        let replayed = next_tick - tick - 1;
        self.stats.resimulations += 1;
        self.stats.resimulated_ticks += replayed;
        tracing::debug!(
            entity = %sim.entity(),
            from = tick,
            to = next_tick - 1,
            replayed,
            ?reason,
            "resimulated from authoritative state"
        );

        Ok(ReconcileOutcome::Resimulated {
            from: tick,
            to: next_tick - 1,
            reason,
        })
    }

    /// The last authoritative tick a pass ran for.
    pub fn last_checked(&self) -> Option<Tick> {
        self.last_checked
    }

    /// Thresholds in use.
    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &ReconcileStats {
        &self.stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
