//! Fixed-rate tick scheduler.
//!
//! The [`TickClock`] turns variable wall-clock frame deltas into a stream of
//! fixed-duration tick indices. Each call to [`advance`](TickClock::advance)
//! adds the frame delta to a carry-over timer and emits one tick for every
//! whole period the timer contains:
//!
//! ```
//! use std::time::Duration;
//! use riposte_sim::clock::TickClock;
//!
//! let mut clock = TickClock::new(60.0);
//! // A 40 ms frame holds two whole 16.6 ms periods.
//! assert_eq!(clock.advance(Duration::from_millis(40)), vec![1, 2]);
//! // The 6.6 ms remainder carries into the next frame.
//! assert_eq!(clock.advance(Duration::from_millis(11)), vec![3]);
//! ```
//!
//! Time is accumulated in integer nanoseconds ([`Duration`]), so the schedule
//! never drifts from repeated floating-point addition.

use std::time::Duration;

use riposte_core::ids::Tick;

// ---------------------------------------------------------------------------
// TickClock
// ---------------------------------------------------------------------------

/// Fixed-rate scheduler emitting monotonically increasing tick indices.
///
/// Ticks are never skipped or reordered; a long frame emits several ticks in
/// one call. The first emitted tick is `1`.
#[derive(Debug, Clone)]
pub struct TickClock {
    /// Duration of one tick.
    period: Duration,
    /// Carry-over time not yet consumed by a tick.
    timer: Duration,
    /// Last emitted tick (0 before the first).
    current_tick: Tick,
    /// Whether the session is simulating.
    running: bool,
}

impl TickClock {
    /// Create a running clock at `tick_rate_hz`.
    ///
    /// # Panics
    ///
    /// Panics if `tick_rate_hz` is not positive and finite.
    pub fn new(tick_rate_hz: f64) -> Self {
        assert!(
            tick_rate_hz > 0.0 && tick_rate_hz.is_finite(),
            "tick_rate_hz must be positive and finite, got {tick_rate_hz}"
        );
        Self {
            period: Duration::from_secs_f64(1.0 / tick_rate_hz),
            timer: Duration::ZERO,
            current_tick: 0,
            running: true,
        }
    }

    /// Add a frame delta and return the ticks that became due, in order.
    ///
    /// A paused clock returns nothing and does not accumulate time.
    pub fn advance(&mut self, delta: Duration) -> Vec<Tick> {
        if !self.running {
            return Vec::new();
        }
        self.timer += delta;
        let mut due = Vec::new();
        while self.timer >= self.period {
            self.timer -= self.period;
            self.current_tick += 1;
            due.push(self.current_tick);
        }
        if due.len() > 1 {
            tracing::trace!(count = due.len(), last = self.current_tick, "clock emitted burst");
        }
        due
    }

    /// Stop emitting ticks. Clears the carry-over timer.
    pub fn pause(&mut self) {
        self.running = false;
        self.timer = Duration::ZERO;
    }

    /// Resume emitting ticks from the last emitted index.
    pub fn resume(&mut self) {
        self.running = true;
    }

    // -- accessors ----------------------------------------------------------

    /// Whether the clock is emitting ticks.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// The last emitted tick, or 0 if none has been emitted.
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Duration of one tick.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick period in seconds.
    pub fn dt(&self) -> f32 {
        self.period.as_secs_f32()
    }

    /// Time accumulated towards the next tick.
    pub fn carry(&self) -> Duration {
        self.timer
    }

    /// Simulation time at the last emitted tick.
    ///
    /// Computed as `tick * period` rather than by accumulation.
    pub fn sim_time(&self) -> Duration {
        let nanos = self.period.as_nanos() * u128::from(self.current_tick);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
