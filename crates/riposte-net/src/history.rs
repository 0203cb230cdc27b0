//! Per-tick input/state history of one entity.
//!
//! [`HistoryBuffer`] is a fixed-capacity ring indexed by `tick % capacity`.
//! Each slot remembers the tick it was written for, so a read for a tick that
//! has since been overwritten returns `None` instead of a newer entry.
//!
//! # Example
//!
//! ```
//! use riposte_core::prelude::*;
//! use riposte_net::history::HistoryBuffer;
//!
//! let config = SimConfig::default();
//! let state = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
//!
//! let mut history = HistoryBuffer::new(4);
//! for tick in 1..=6 {
//!     history.record(tick, InputSnapshot::idle(), state.clone());
//! }
//!
//! // Ticks 1 and 2 were overwritten by 5 and 6.
//! assert!(history.get(2).is_none());
//! assert_eq!(history.get(5).unwrap().tick, 5);
//! assert_eq!(history.oldest_tick(), Some(3));
//! assert!(history.is_evicted(2));
//! ```

use serde::{Deserialize, Serialize};

use riposte_core::ids::Tick;
use riposte_core::input::InputSnapshot;
use riposte_core::state::StateSnapshot;

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// The input applied at `tick` and the state it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub tick: Tick,
    pub input: InputSnapshot,
    pub state: StateSnapshot,
}

// ---------------------------------------------------------------------------
// HistoryBuffer
// ---------------------------------------------------------------------------

/// Ring buffer of [`HistoryEntry`] values, one slot per `tick % capacity`.
#[derive(Debug, Clone)]
pub struct HistoryBuffer {
    slots: Vec<Option<HistoryEntry>>,
    first: Option<Tick>,
    latest: Option<Tick>,
}

impl HistoryBuffer {
    /// Create an empty buffer holding `capacity` ticks.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "HistoryBuffer::new: capacity must be > 0");
        Self {
            slots: vec![None; capacity],
            first: None,
            latest: None,
        }
    }

    /// Number of ticks the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot(&self, tick: Tick) -> usize {
        (tick % self.slots.len() as u64) as usize
    }

    /// Write the entry for `tick`, replacing whatever the slot held.
    ///
    /// Rewriting an older tick (as resimulation does) leaves
    /// [`latest_tick`](Self::latest_tick) unchanged.
    pub fn record(&mut self, tick: Tick, input: InputSnapshot, state: StateSnapshot) {
        let slot = self.slot(tick);
        self.slots[slot] = Some(HistoryEntry { tick, input, state });
        self.latest = Some(self.latest.map_or(tick, |latest| latest.max(tick)));
        self.first = Some(self.first.map_or(tick, |first| first.min(tick)));
    }

    /// The entry for `tick`, if its slot still holds that tick.
    pub fn get(&self, tick: Tick) -> Option<&HistoryEntry> {
        self.slots[self.slot(tick)]
            .as_ref()
            .filter(|entry| entry.tick == tick)
    }

    /// The state recorded for `tick`.
    pub fn state(&self, tick: Tick) -> Option<&StateSnapshot> {
        self.get(tick).map(|entry| &entry.state)
    }

    /// The input recorded for `tick`.
    pub fn input(&self, tick: Tick) -> Option<&InputSnapshot> {
        self.get(tick).map(|entry| &entry.input)
    }

    /// Highest tick ever recorded.
    pub fn latest_tick(&self) -> Option<Tick> {
        self.latest
    }

    /// Lowest tick still inside the retained window.
    pub fn oldest_tick(&self) -> Option<Tick> {
        let latest = self.latest?;
        let window_start = latest.saturating_sub(self.slots.len() as u64 - 1);
        self.first.map(|first| first.max(window_start))
    }

    /// Whether `tick` has fallen out of the retained window.
    pub fn is_evicted(&self, tick: Tick) -> bool {
        match self.latest {
            Some(latest) => tick.saturating_add(self.slots.len() as u64) <= latest,
            None => false,
        }
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Returns `true` if nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.latest.is_none()
    }

    /// Forget every entry.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.first = None;
        self.latest = None;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
