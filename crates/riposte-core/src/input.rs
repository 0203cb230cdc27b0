//! Per-tick player input.
//!
//! An [`InputSnapshot`] is sampled exactly once per tick on the owning side,
//! recorded in the history buffer, sent to the authority, and replayed
//! verbatim during resimulation. It is immutable once sampled.

use serde::{Deserialize, Serialize};

use crate::math::Vec2;

/// Which attack button (if any) was pressed this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AttackClick {
    /// No attack input.
    #[default]
    None,
    /// Light attack (primary button).
    Light,
    /// Heavy attack or parry (secondary button).
    Heavy,
}

/// Locomotion input.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MoveInput {
    /// Desired direction; `+y` is camera-forward. Digital input uses
    /// components in `{-1, 0, 1}`.
    pub direction: Vec2,
    /// Sprint modifier held.
    pub sprint: bool,
}

impl MoveInput {
    /// Input magnitude for analog sticks, clamped to `[0, 1]`.
    pub fn magnitude(&self) -> f32 {
        self.direction.length().min(1.0)
    }
}

/// Camera look input.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LookInput {
    /// Yaw (x) and pitch (y) delta.
    pub delta: Vec2,
    /// The active device is a pointer (mouse). Pointer deltas are already
    /// per-frame and are not scaled by the tick period.
    pub pointer: bool,
}

/// Immutable per-entity, per-tick input record.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSnapshot {
    /// Jump pressed.
    pub jump: bool,
    /// Move vector and sprint flag.
    pub movement: MoveInput,
    /// Camera look delta.
    pub look: LookInput,
    /// Attack button.
    pub attack: AttackClick,
}

impl InputSnapshot {
    /// An input with nothing pressed.
    pub fn idle() -> Self {
        Self::default()
    }

    /// Convenience: walk (or sprint) in `direction`.
    pub fn moving(direction: Vec2, sprint: bool) -> Self {
        Self {
            movement: MoveInput { direction, sprint },
            ..Self::default()
        }
    }

    /// Convenience: press an attack button with no other input.
    pub fn attacking(click: AttackClick) -> Self {
        Self {
            attack: click,
            ..Self::default()
        }
    }

    /// Convenience: press jump with no other input.
    pub fn jumping() -> Self {
        Self {
            jump: true,
            ..Self::default()
        }
    }
}
