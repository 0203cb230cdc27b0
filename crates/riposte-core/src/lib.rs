//! Riposte Core -- shared data model for the fixed-tick melee simulation.
//!
//! This crate holds everything that every participant of a session must agree
//! on bit for bit: tick and entity identifiers, the per-tick
//! [`InputSnapshot`](input::InputSnapshot) and
//! [`StateSnapshot`](state::StateSnapshot) records, the deterministic math
//! helpers the pipeline is built from, the shared [`SimConfig`](config::SimConfig)
//! and the static weapon catalog.
//!
//! # Quick Start
//!
//! ```
//! use riposte_core::prelude::*;
//!
//! let config = SimConfig::default();
//! let state = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
//! assert!(state.grounded);
//!
//! let catalog = WeaponCatalog::default();
//! let sword = catalog.get(WeaponName::Sword).unwrap();
//! assert_eq!(sword.light_attack_two_id(), sword.light_attack_one_id + 1);
//! ```

#![deny(unsafe_code)]

pub mod config;
pub mod ids;
pub mod input;
pub mod math;
pub mod state;
pub mod weapon;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced while loading or validating shared data.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A configuration value violates an invariant.
    #[error("invalid config field '{field}': {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    /// A configuration or catalog document is not valid JSON for its schema.
    #[error("failed to parse JSON document: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// A configuration file could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A weapon catalog entry references ids the animation graph does not know.
    #[error("invalid weapon {name:?}: {reason}")]
    InvalidWeapon {
        name: weapon::WeaponName,
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::config::{CameraConfig, CombatConfig, LocomotionConfig, NetConfig, SimConfig};
    pub use crate::ids::{ClipId, EntityId, LayerMask, Tick, SPAWN_TICK};
    pub use crate::input::{AttackClick, InputSnapshot, LookInput, MoveInput};
    pub use crate::math::{Vec2, Vec3};
    pub use crate::state::{
        AnimationParams, AnimationState, AttackState, CameraState, DamageState, JumpState,
        MovementState, StateSnapshot,
    };
    pub use crate::weapon::{WeaponCatalog, WeaponData, WeaponName};
    pub use crate::CoreError;
}
