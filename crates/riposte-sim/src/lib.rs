//! Riposte Sim -- deterministic per-entity tick pipeline.
//!
//! This crate builds on [`riposte_core`] to provide the simulation driver: a
//! fixed-rate [`TickClock`](clock::TickClock) and an
//! [`EntitySimulator`](pipeline::EntitySimulator) that runs the stage pipeline
//! (gravity, grounded, movement, camera, animation, attack, damage) in a fixed
//! order. Everything the pipeline needs from the outside world is injected
//! through the collaborator traits in [`oracle`].
//!
//! # Quick Start
//!
//! ```
//! use riposte_core::prelude::*;
//! use riposte_sim::prelude::*;
//! use riposte_sim::oracle::stub::Headless;
//!
//! let config = SimConfig::default();
//! let spawn = StateSnapshot::spawn(Vec3::ZERO, 0.0, &config.locomotion);
//! let mut sim = EntitySimulator::new(EntityId::new(1), &config, spawn);
//! sim.equip(WeaponName::Sword, &WeaponCatalog::default());
//!
//! let world = Headless::default();
//! let mut clock = TickClock::new(config.tick_rate_hz);
//! for tick in clock.advance(std::time::Duration::from_millis(101)) {
//!     let input = InputSnapshot::moving(Vec2::new(0.0, 1.0), false);
//!     sim.step(tick, &input, &world.oracles(), StepMode::Live);
//! }
//!
//! assert_eq!(sim.tick(), 6);
//! assert!(sim.state().position().z > 0.0);
//! ```

#![deny(unsafe_code)]

pub mod animation;
pub mod attack;
pub mod camera;
pub mod clock;
pub mod damage;
pub mod locomotion;
pub mod oracle;
pub mod pipeline;
pub mod replay;

/// Re-export the core crate for convenience.
pub use riposte_core;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by the animation parameter table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParamError {
    /// The parameter was registered twice.
    #[error("animation parameter {param:?} is already registered")]
    AlreadyRegistered { param: animation::Param },

    /// The parameter was never registered.
    #[error("animation parameter {param:?} is not registered")]
    NotRegistered { param: animation::Param },

    /// A value of the wrong kind was written or read.
    #[error("animation parameter {param:?} is {expected}, got {found}")]
    KindMismatch {
        param: animation::Param,
        expected: animation::ParamKind,
        found: animation::ParamKind,
    },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::animation::{
        AnimationEvent, AnimationPlayback, AnimationStep, ClipGraph, LocomotionSignals, Param,
        ParamKind, ParamTable, ParamValue,
    };
    pub use crate::attack::{AttackOutcome, ParryEvent};
    pub use crate::camera::CameraOrientation;
    pub use crate::clock::TickClock;
    pub use crate::damage::{hazard_hits, DamageEvent, Hazard, HealthChange, HealthLedger};
    pub use crate::oracle::{
        GroundOracle, HitScanOracle, InputSampler, MotionResolver, Oracles, ParryOracle,
    };
    pub use crate::pipeline::{
        EntitySimulator, Reaction, StepDiagnostics, StepMode, TickOutput, STAGE_ORDER,
    };
    pub use crate::replay::{
        replay, ReplayDivergence, ReplayEntry, ReplayLog, ReplayRecorder, ReplayResult,
    };
    pub use crate::ParamError;
}
