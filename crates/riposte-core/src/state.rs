//! Per-entity, per-tick simulation state.
//!
//! A [`StateSnapshot`] is the single named record produced by one tick of the
//! pipeline. It carries one slice per sub-step so that every field has a
//! stable name on the wire and in the history buffer:
//!
//! | Slice       | Written by          |
//! |-------------|---------------------|
//! | `jump`      | gravity/jump        |
//! | `grounded`  | grounded check      |
//! | `movement`  | movement + rotation |
//! | `camera`    | camera              |
//! | `animation` | animation + attack  |
//! | `attack`    | attack              |
//! | `damage`    | damage aggregation  |
//!
//! The state for tick `T` is fully determined by the state for `T - 1`, the
//! input for `T`, and the collaborator (oracle) results observed during `T`.
//!
//! # Digests
//!
//! [`StateSnapshot::digest`] hashes the canonical JSON encoding with BLAKE3.
//! Two snapshots with equal digests are bit-identical, which is what the
//! determinism and replay checks compare.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::LocomotionConfig;
use crate::ids::{ClipId, EntityId};
use crate::math::{wrap_degrees, Vec3};

// ---------------------------------------------------------------------------
// Slices
// ---------------------------------------------------------------------------

/// Gravity/jump slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpState {
    /// Vertical velocity in m/s (positive is up).
    pub vertical_velocity: f32,
    /// Seconds until another jump is allowed.
    pub jump_timeout: f32,
    /// Seconds of airtime before the free-fall state is entered.
    pub fall_timeout: f32,
    /// Resolved jump flag (always false while airborne).
    pub jump: bool,
}

/// Movement + rotation slice.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    /// Horizontal speed chosen this tick (m/s, rounded to 3 decimals while
    /// accelerating).
    pub speed: f32,
    /// Smoothed speed forwarded to the animation layer.
    pub animation_blend: f32,
    /// Angular velocity carried by the rotation spring.
    pub rotation_velocity: f32,
    /// World position after motion resolution.
    pub position: Vec3,
    /// World position at the end of the previous tick.
    pub previous_position: Vec3,
    /// Facing yaw in `[0, 360)`.
    pub yaw: f32,
    /// Yaw the entity is turning towards and translating along.
    pub target_yaw: f32,
    /// Camera yaw the move input was interpreted against.
    pub camera_reference_yaw: f32,
}

/// Camera slice. Stored angles never include the static pitch override.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraState {
    /// Accumulated yaw, wrapped into `[-360, 360]`.
    pub yaw: f32,
    /// Accumulated pitch, clamped to the configured range.
    pub pitch: f32,
}

/// Every animation parameter, by name.
///
/// The animation layer keeps these in a typed table; this record is its
/// serializable image.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationParams {
    /// Blended locomotion speed.
    pub speed: f32,
    /// Analog input magnitude (1 for digital input).
    pub motion_speed: f32,
    /// Grounded flag mirrored from the grounded check.
    pub grounded: bool,
    /// Jump started.
    pub jump: bool,
    /// Free-fall entered.
    pub free_fall: bool,
    /// An attack clip is requested or playing.
    pub attacking: bool,
    /// Requested attack id (0 = none).
    pub attack_id: i32,
    /// A hit reaction is requested or playing.
    pub taking_damage: bool,
    /// Requested hit reaction id (0 = none).
    pub take_damage_id: i32,
    /// This entity is performing a parry.
    pub parrying: bool,
    /// Parry id: the performed parry, or the "got parried" reaction.
    pub parry_id: i32,
    /// The current attack is inside its parryable window.
    pub can_be_parried: bool,
    /// The combo window is open.
    pub can_combo: bool,
    /// The combo window has closed for the current attack.
    pub combo_window_closed: bool,
    /// The melee damage window is open.
    pub can_deal_melee_damage: bool,
}

/// Animation slice.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnimationState {
    /// Active clip.
    pub clip: ClipId,
    /// Normalized playback time of the active clip (1.0 = one full play).
    pub normalized_time: f32,
    /// Full parameter set.
    pub params: AnimationParams,
}

/// Attack slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttackState {
    /// Last resolved attack id (0 = none).
    pub last_attack_id: i32,
}

/// Damage slice: hits collected in the current damage window, keyed by
/// target. Each target appears at most once per window.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DamageState {
    /// Target -> damage amount, awaiting the damage frame.
    pub pending: BTreeMap<EntityId, u32>,
}

// ---------------------------------------------------------------------------
// StateSnapshot
// ---------------------------------------------------------------------------

/// Immutable per-entity, per-tick aggregate state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    /// Gravity/jump slice.
    pub jump: JumpState,
    /// Grounded-check result.
    pub grounded: bool,
    /// Movement + rotation slice.
    pub movement: MovementState,
    /// Camera slice.
    pub camera: CameraState,
    /// Animation slice.
    pub animation: AnimationState,
    /// Attack slice.
    pub attack: AttackState,
    /// Damage slice.
    pub damage: DamageState,
}

impl StateSnapshot {
    /// The state of an entity that has just been spawned, standing still at
    /// `position` facing `yaw`. Timeouts start at their configured maximum.
    pub fn spawn(position: Vec3, yaw: f32, locomotion: &LocomotionConfig) -> Self {
        let yaw = wrap_degrees(yaw);
        // Camera yaw is kept in (-180, 180] so small look deltas never hit
        // the single-turn wrap.
        let camera_yaw = if yaw < 180.0 { yaw } else { yaw - 360.0 };
        Self {
            jump: JumpState {
                vertical_velocity: 0.0,
                jump_timeout: locomotion.jump_timeout,
                fall_timeout: locomotion.fall_timeout,
                jump: false,
            },
            grounded: true,
            movement: MovementState {
                speed: 0.0,
                animation_blend: 0.0,
                rotation_velocity: 0.0,
                position,
                previous_position: position,
                yaw,
                target_yaw: yaw,
                camera_reference_yaw: camera_yaw,
            },
            camera: CameraState {
                yaw: camera_yaw,
                pitch: 0.0,
            },
            animation: AnimationState {
                clip: ClipId::NONE,
                normalized_time: 0.0,
                params: AnimationParams {
                    grounded: true,
                    motion_speed: 1.0,
                    ..AnimationParams::default()
                },
            },
            attack: AttackState::default(),
            damage: DamageState::default(),
        }
    }

    /// World position shorthand.
    pub fn position(&self) -> Vec3 {
        self.movement.position
    }

    /// Facing yaw shorthand.
    pub fn yaw(&self) -> f32 {
        self.movement.yaw
    }

    /// BLAKE3 hex digest (64 lowercase hex chars) of the canonical JSON
    /// encoding of this snapshot.
    pub fn digest(&self) -> String {
        let json_bytes =
            serde_json::to_vec(self).expect("StateSnapshot should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn spawn() -> StateSnapshot {
        StateSnapshot::spawn(Vec3::new(1.0, 0.0, 2.0), 90.0, &LocomotionConfig::default())
    }

    #[test]
    fn spawn_state_starts_grounded_with_full_timeouts() {
        let config = LocomotionConfig::default();
        let state = spawn();
        assert!(state.grounded);
        assert_eq!(state.jump.jump_timeout, config.jump_timeout);
        assert_eq!(state.jump.fall_timeout, config.fall_timeout);
        assert_eq!(state.movement.previous_position, state.movement.position);
        assert_eq!(state.yaw(), 90.0);
        assert_eq!(state.camera.yaw, 90.0);
    }

    #[test]
    fn spawn_camera_yaw_is_signed() {
        let state = StateSnapshot::spawn(Vec3::ZERO, 270.0, &LocomotionConfig::default());
        assert_eq!(state.yaw(), 270.0);
        assert_eq!(state.camera.yaw, -90.0);
    }

    #[test]
    fn digest_is_stable_and_sensitive() {
        let a = spawn();
        let b = spawn();
        assert_eq!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);

        let mut c = spawn();
        c.damage.pending.insert(EntityId::new(7), 15);
        assert_ne!(a.digest(), c.digest());
    }

    #[test]
    fn snapshot_json_roundtrip_preserves_pending_damage() {
        let mut state = spawn();
        state.damage.pending.insert(EntityId::new(3), 20);
        let json = serde_json::to_string(&state).unwrap();
        let back: StateSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }
}
