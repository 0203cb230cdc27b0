//! In-memory link between participants.
//!
//! [`LoopbackLink`] carries encoded [`NetMessage`]s from one participant to
//! another with a per-message latency measured in ticks. Messages sent with
//! different latencies overtake each other, which is how tests and headless
//! sessions exercise reordering. Everything goes through the binary codec so
//! the bytes are exactly what a real transport would carry.

use std::collections::BTreeMap;

use riposte_core::ids::Tick;

use crate::message::NetMessage;
use crate::CodecError;

// ---------------------------------------------------------------------------
// LoopbackLink
// ---------------------------------------------------------------------------

/// One-directional delayed message link.
#[derive(Debug, Clone, Default)]
pub struct LoopbackLink {
    latency: Tick,
    /// Keyed by delivery tick, then send order.
    in_flight: BTreeMap<(Tick, u64), Vec<u8>>,
    sequence: u64,
    bytes_sent: u64,
}

impl LoopbackLink {
    /// A link delivering every message `latency` ticks after it was sent.
    pub fn new(latency: Tick) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Send `message` at tick `now` with the link's latency.
    pub fn send(&mut self, now: Tick, message: &NetMessage) -> Result<(), CodecError> {
        self.send_with_latency(now, self.latency, message)
    }

    /// Send `message` at tick `now`, delivered `latency` ticks later.
    pub fn send_with_latency(
        &mut self,
        now: Tick,
        latency: Tick,
        message: &NetMessage,
    ) -> Result<(), CodecError> {
        let bytes = message.encode()?;
        self.bytes_sent += bytes.len() as u64;
        self.in_flight.insert((now + latency, self.sequence), bytes);
        self.sequence += 1;
        Ok(())
    }

    /// Every message due at or before `now`, in delivery order.
    pub fn deliver(&mut self, now: Tick) -> Result<Vec<NetMessage>, CodecError> {
        let later = self.in_flight.split_off(&(now + 1, 0));
        let due = std::mem::replace(&mut self.in_flight, later);
        due.into_values()
            .map(|bytes| NetMessage::decode(&bytes))
            .collect()
    }

    /// Messages not yet delivered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Total encoded bytes sent.
    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
