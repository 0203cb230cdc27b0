//! Host-side queue of remote inputs.
//!
//! The authority simulates a remote entity at the ticks its owner stamped on
//! the inputs, so both sides compare states for the same tick. Inputs arrive
//! late, sometimes out of order and sometimes not at all. [`InputQueue`]
//! turns that stream into an ordered sequence of ticks to simulate:
//!
//! - inputs are kept sorted by tick;
//! - inputs at or before the last simulated tick are stale and dropped;
//! - when the next tick's input is missing but a later one is waiting, the
//!   gap is filled by repeating the last consumed input;
//! - when more than `max_queue` inputs are waiting, several ticks are
//!   consumed in one host tick until the backlog is back under the limit.
//!
//! # Example
//!
//! ```
//! use riposte_core::prelude::*;
//! use riposte_net::authority::InputQueue;
//!
//! let mut queue = InputQueue::new(SPAWN_TICK, 8);
//! queue.push(2, InputSnapshot::jumping());
//! queue.push(1, InputSnapshot::idle());
//!
//! let batch = queue.drain();
//! assert_eq!(batch.len(), 1);
//! assert_eq!(batch[0].tick, 1);
//! assert_eq!(queue.drain()[0].tick, 2);
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use riposte_core::ids::Tick;
use riposte_core::input::InputSnapshot;

// ---------------------------------------------------------------------------
// QueuedInput
// ---------------------------------------------------------------------------

/// One tick the authority should simulate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueuedInput {
    pub tick: Tick,
    pub input: InputSnapshot,
    /// The input was never received and repeats the previous one.
    pub repeated: bool,
}

/// Queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Inputs accepted into the queue.
    pub received: u64,
    /// Inputs dropped because their tick was already simulated.
    pub stale: u64,
    /// Inputs dropped because their tick was already queued.
    pub duplicates: u64,
    /// Ticks simulated with a repeated input.
    pub filled: u64,
    /// Host ticks that consumed more than one input.
    pub catch_ups: u64,
}

// ---------------------------------------------------------------------------
// InputQueue
// ---------------------------------------------------------------------------

/// Tick-ordered queue of one remote entity's inputs.
#[derive(Debug, Clone)]
pub struct InputQueue {
    pending: BTreeMap<Tick, InputSnapshot>,
    last_tick: Tick,
    last_input: InputSnapshot,
    max_queue: usize,
    stats: QueueStats,
}

impl InputQueue {
    /// A queue whose entity was last simulated at `last_tick`.
    pub fn new(last_tick: Tick, max_queue: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            last_tick,
            last_input: InputSnapshot::idle(),
            max_queue,
            stats: QueueStats::default(),
        }
    }

    /// Queue `input` for `tick`. Returns `false` if it was dropped.
    pub fn push(&mut self, tick: Tick, input: InputSnapshot) -> bool {
        if tick <= self.last_tick {
            self.stats.stale += 1;
            tracing::warn!(tick, last = self.last_tick, "stale input dropped");
            return false;
        }
        if self.pending.contains_key(&tick) {
            self.stats.duplicates += 1;
            tracing::debug!(tick, "duplicate input dropped");
            return false;
        }
        self.pending.insert(tick, input);
        self.stats.received += 1;
        true
    }

    /// The ticks to simulate this host tick, in order.
    ///
    /// Empty while nothing is queued. Normally one tick; more while the
    /// backlog exceeds the limit.
    pub fn drain(&mut self) -> Vec<QueuedInput> {
        let mut batch = Vec::new();
        while !self.pending.is_empty() {
            let tick = self.last_tick + 1;
            let (input, repeated) = match self.pending.remove(&tick) {
                Some(input) => (input, false),
                None => {
                    self.stats.filled += 1;
                    tracing::debug!(tick, "input missing, repeating last input");
                    (self.last_input, true)
                }
            };
            self.last_tick = tick;
            self.last_input = input;
            batch.push(QueuedInput {
                tick,
                input,
                repeated,
            });
            if self.pending.len() <= self.max_queue {
                break;
            }
        }
        if batch.len() > 1 {
            self.stats.catch_ups += 1;
            tracing::debug!(ticks = batch.len(), last = self.last_tick, "input queue catching up");
        }
        batch
    }

    /// Last tick handed out by [`drain`](Self::drain).
    pub fn last_tick(&self) -> Tick {
        self.last_tick
    }

    /// Number of queued inputs.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
