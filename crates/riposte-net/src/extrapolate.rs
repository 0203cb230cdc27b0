//! Virtual-tick extrapolation of observed entities.
//!
//! An observer neither owns an entity nor simulates it authoritatively. It
//! only sees the inputs the authority relays and the states it broadcasts,
//! both of which arrive late. The [`RemoteExtrapolator`] keeps a virtual tick
//! that runs `lead` ticks ahead of the newest authoritative snapshot and
//! feeds the last relayed input into the pipeline for every virtual tick.
//!
//! The lead is how far the owner runs ahead of the authority: the owner's
//! current tick minus the newest authoritative tick it has confirmed. The
//! owner stamps it on every input it sends and the authority relays it, so
//! an observer anchored at `latest authoritative tick + lead` draws the
//! entity roughly where its owner sees it. Small jitter in the lead is
//! ignored; a change larger than `lead_threshold` re-anchors the virtual tick
//! and raises a force flag so the next reconciliation pass rebuilds the
//! extrapolated history from the authoritative state.

use riposte_core::ids::Tick;
use riposte_core::input::InputSnapshot;

// ---------------------------------------------------------------------------
// RemoteExtrapolator
// ---------------------------------------------------------------------------

/// Extrapolation state for one observed entity.
#[derive(Debug, Clone)]
pub struct RemoteExtrapolator {
    lead_threshold: u64,
    last_input: Option<(Tick, InputSnapshot)>,
    latest_auth_tick: Option<Tick>,
    lead: u64,
    virtual_tick: Option<Tick>,
    force: bool,
}

impl RemoteExtrapolator {
    /// An extrapolator that re-anchors when the lead moves by more than
    /// `lead_threshold` ticks.
    pub fn new(lead_threshold: u64) -> Self {
        Self {
            lead_threshold,
            last_input: None,
            latest_auth_tick: None,
            lead: 0,
            virtual_tick: None,
            force: false,
        }
    }

    /// A relayed input for `tick`, with the lead its owner reported. Only
    /// the newest relayed tick is kept.
    pub fn observe_relay(&mut self, tick: Tick, input: InputSnapshot, lead: u64) {
        if let Some((held, _)) = self.last_input {
            if tick <= held {
                tracing::trace!(tick, held, "stale relayed input ignored");
                return;
            }
        }
        self.last_input = Some((tick, input));
        self.observe_lead(lead);
    }

    /// An authoritative snapshot for `tick` was accepted.
    ///
    /// The first one anchors the virtual tick at `tick + lead` and forces a
    /// reconciliation pass.
    pub fn observe_authoritative(&mut self, tick: Tick) {
        match self.latest_auth_tick {
            None => {
                self.latest_auth_tick = Some(tick);
                self.virtual_tick = Some(tick + self.lead);
                self.force = true;
                tracing::debug!(tick, lead = self.lead, "extrapolation anchored");
            }
            Some(held) if tick > held => self.latest_auth_tick = Some(tick),
            Some(_) => {}
        }
    }

    /// Feed a lead measurement in ticks. Before the first authoritative
    /// snapshot it is adopted as is. Afterwards, returns `true` if it moved
    /// far enough to re-anchor the virtual tick.
    pub fn observe_lead(&mut self, ticks: u64) -> bool {
        let Some(auth) = self.latest_auth_tick else {
            self.lead = ticks;
            return false;
        };
        if ticks.abs_diff(self.lead) <= self.lead_threshold {
            return false;
        }
        tracing::debug!(from = self.lead, to = ticks, auth, "extrapolation lead changed");
        self.lead = ticks;
        self.virtual_tick = Some(auth + ticks);
        self.force = true;
        true
    }

    /// Move to the next virtual tick and return it, or `None` before the
    /// first authoritative snapshot.
    pub fn advance(&mut self) -> Option<Tick> {
        let next = self.virtual_tick? + 1;
        self.virtual_tick = Some(next);
        Some(next)
    }

    /// The input to extrapolate with: the newest relayed one, idle if none
    /// has arrived.
    pub fn input(&self) -> InputSnapshot {
        self.last_input.map(|(_, input)| input).unwrap_or_default()
    }

    /// Take the force flag, clearing it.
    pub fn take_force(&mut self) -> bool {
        std::mem::take(&mut self.force)
    }

    /// The virtual tick last simulated (or anchored).
    pub fn virtual_tick(&self) -> Option<Tick> {
        self.virtual_tick
    }

    /// Current lead in ticks.
    pub fn lead(&self) -> u64 {
        self.lead
    }

    /// Tick of the newest relayed input.
    pub fn last_relay_tick(&self) -> Option<Tick> {
        self.last_input.map(|(tick, _)| tick)
    }

    /// Tick of the newest authoritative snapshot.
    pub fn latest_authoritative_tick(&self) -> Option<Tick> {
        self.latest_auth_tick
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
