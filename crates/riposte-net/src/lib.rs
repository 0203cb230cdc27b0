//! Riposte Net -- prediction, authority and reconciliation.
//!
//! This crate runs the [`riposte_sim`] pipeline on every participant of a
//! session and keeps them consistent:
//!
//! - [`history`]: per-tick ring buffer of the inputs and states an entity
//!   went through.
//! - [`reconcile`]: divergence detection against the authoritative state and
//!   deterministic resimulation of buffered inputs.
//! - [`extrapolate`]: virtual-tick extrapolation of entities this participant
//!   neither owns nor simulates authoritatively.
//! - [`authority`]: the host-side input queue.
//! - [`message`]: network messages and their binary codec.
//! - [`participant`]: the driver that ties everything to a tick clock.
//! - [`loopback`]: an in-memory latency link for headless sessions.
//!
//! # Quick Start
//!
//! ```
//! use std::time::Duration;
//! use riposte_core::prelude::*;
//! use riposte_net::prelude::*;
//! use riposte_sim::oracle::stub::ScriptedSampler;
//!
//! let config = SimConfig::default();
//! let catalog = WeaponCatalog::default();
//! let player = EntityId::new(1);
//! let spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
//!
//! let mut host = Participant::new(&config, &catalog);
//! host.spawn_authoritative(player, spawn.clone(), WeaponName::Sword);
//!
//! let mut client = Participant::new(&config, &catalog);
//! let walk = vec![InputSnapshot::moving(Vec2::new(0.0, 1.0), false); 30];
//! client.spawn_owned(player, spawn, WeaponName::Sword, Box::new(ScriptedSampler::new(walk)));
//!
//! for _ in 0..30 {
//!     client.tick_once();
//!     for message in client.drain_outbox() {
//!         host.receive(message);
//!     }
//!     host.tick_once();
//!     for message in host.drain_outbox() {
//!         client.receive(message);
//!     }
//! }
//!
//! let predicted = client.state(player).unwrap().position();
//! let authoritative = host.state(player).unwrap().position();
//! assert!(predicted.distance(authoritative) < 1e-4);
//! ```

#![deny(unsafe_code)]

pub mod authority;
pub mod extrapolate;
pub mod history;
pub mod loopback;
pub mod message;
pub mod participant;
pub mod reconcile;

/// Re-export the simulation crate for convenience.
pub use riposte_sim;

use riposte_core::ids::Tick;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// The authoritative tick has already been overwritten in the history
    /// buffer, so its inputs can no longer be replayed.
    #[error("authoritative tick {tick} was evicted from history (oldest retained: {oldest})")]
    Evicted { tick: Tick, oldest: Tick },
}

/// Errors produced by the message codec.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("decode error: {0}")]
    Decode(#[from] bincode::error::DecodeError),
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::authority::{InputQueue, QueueStats, QueuedInput};
    pub use crate::extrapolate::RemoteExtrapolator;
    pub use crate::history::{HistoryBuffer, HistoryEntry};
    pub use crate::loopback::LoopbackLink;
    pub use crate::message::NetMessage;
    pub use crate::participant::{
        CombatNotice, Participant, ParticipantTick, Role, SessionWorld,
    };
    pub use crate::reconcile::{
        AuthoritativeSlot, AuthoritativeSnapshot, DivergenceReason, ReconcileConfig,
        ReconcileOutcome, ReconcileStats, ReconciliationEngine,
    };
    pub use crate::{CodecError, ReconcileError};
}
