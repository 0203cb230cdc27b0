//! Simulation configuration.
//!
//! [`SimConfig`] is a plain serde document. Every participant must run with an
//! identical configuration, since any difference shows up as a
//! reconciliation divergence. Defaults reproduce the tuning of the reference
//! game (60 Hz, 1.2 m jump, -15 m/s² gravity, ...).
//!
//! ```
//! use riposte_core::config::SimConfig;
//!
//! let config = SimConfig::from_json_str(r#"{ "tick_rate_hz": 30.0 }"#).unwrap();
//! assert_eq!(config.tick_rate_hz, 30.0);
//! // Unspecified sections keep their defaults.
//! assert_eq!(config.locomotion.jump_height, 1.2);
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::CoreError;

// ---------------------------------------------------------------------------
// LocomotionConfig
// ---------------------------------------------------------------------------

/// Character-controller tuning for the gravity/jump, grounded and movement
/// sub-steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionConfig {
    /// Walk speed in m/s.
    pub move_speed: f32,
    /// Sprint speed in m/s.
    pub sprint_speed: f32,
    /// Time the rotation spring takes to face the move direction.
    pub rotation_smooth_time: f32,
    /// Acceleration/deceleration rate.
    pub speed_change_rate: f32,
    /// Speeds within this distance of the target snap to it.
    pub speed_offset: f32,
    /// Blend values below this snap to zero.
    pub blend_snap: f32,
    /// Jump apex height in metres.
    pub jump_height: f32,
    /// Gravity in m/s² (negative is down).
    pub gravity: f32,
    /// Vertical velocity a grounded entity is pinned to when falling.
    pub grounded_velocity: f32,
    /// Upward velocity ceiling under which gravity still integrates.
    pub terminal_velocity: f32,
    /// Seconds between jumps.
    pub jump_timeout: f32,
    /// Seconds of airtime before free fall.
    pub fall_timeout: f32,
    /// Vertical offset of the ground probe relative to the entity origin.
    pub grounded_offset: f32,
    /// Radius of the ground probe sphere.
    pub grounded_radius: f32,
    /// Scale target speed by the analog stick magnitude.
    pub analog_movement: bool,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            move_speed: 2.0,
            sprint_speed: 5.335,
            rotation_smooth_time: 0.12,
            speed_change_rate: 10.0,
            speed_offset: 0.1,
            blend_snap: 0.01,
            jump_height: 1.2,
            gravity: -15.0,
            grounded_velocity: -2.0,
            terminal_velocity: 53.0,
            jump_timeout: 0.5,
            fall_timeout: 0.15,
            grounded_offset: -0.14,
            grounded_radius: 0.28,
            analog_movement: false,
        }
    }
}

// ---------------------------------------------------------------------------
// CameraConfig
// ---------------------------------------------------------------------------

/// Camera orbit tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Highest pitch in degrees.
    pub top_clamp: f32,
    /// Lowest pitch in degrees.
    pub bottom_clamp: f32,
    /// Extra pitch added to the externally consumed orientation only.
    pub angle_override: f32,
    /// Ignore look input entirely.
    pub lock_camera_position: bool,
    /// Squared look magnitude below which input is ignored.
    pub look_threshold: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            top_clamp: 70.0,
            bottom_clamp: -30.0,
            angle_override: 0.0,
            lock_camera_position: false,
            look_threshold: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// CombatConfig
// ---------------------------------------------------------------------------

/// Melee tuning that is not weapon specific.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Radius around the entity searched for parryable opponents.
    pub parry_radius: f32,
    /// Height above the entity origin that melee hit scans start from.
    pub hit_origin_height: f32,
    /// Health of a freshly spawned entity and the upper clamp.
    pub max_health: u32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            parry_radius: 2.25,
            hit_origin_height: 1.0,
            max_health: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// NetConfig
// ---------------------------------------------------------------------------

/// Prediction, reconciliation and extrapolation tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// History ring capacity in ticks (1024 ≈ 17 s at 60 Hz).
    pub history_capacity: usize,
    /// Position error (metres) above which a correction is applied.
    pub position_epsilon: f32,
    /// Yaw error (degrees) above which a correction is applied.
    pub yaw_epsilon_degrees: f32,
    /// Animation clips are compared against buffered ticks within ±N of the
    /// authoritative tick, absorbing one-tick transition skew.
    pub animation_tick_tolerance: u64,
    /// Change in measured lead (ticks) that re-anchors an extrapolated
    /// entity and forces reconciliation.
    pub lead_threshold: u64,
    /// Queued remote inputs above which the authority catches up by
    /// simulating more than one tick per host tick.
    pub max_input_queue: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            history_capacity: 1024,
            position_epsilon: 0.03,
            yaw_epsilon_degrees: 1.0,
            animation_tick_tolerance: 1,
            lead_threshold: 2,
            max_input_queue: 8,
        }
    }
}

// ---------------------------------------------------------------------------
// SimConfig
// ---------------------------------------------------------------------------

/// Top-level configuration shared by all participants of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Fixed tick rate. Must be positive and finite.
    pub tick_rate_hz: f64,
    /// Character controller.
    pub locomotion: LocomotionConfig,
    /// Camera.
    pub camera: CameraConfig,
    /// Melee.
    pub combat: CombatConfig,
    /// Networking.
    pub net: NetConfig,
}

impl Default for SimConfig {
    /// Defaults to 60 Hz.
    fn default() -> Self {
        Self {
            tick_rate_hz: 60.0,
            locomotion: LocomotionConfig::default(),
            camera: CameraConfig::default(),
            combat: CombatConfig::default(),
            net: NetConfig::default(),
        }
    }
}

impl SimConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CoreError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        tracing::debug!(path = %path.display(), tick_rate_hz = config.tick_rate_hz, "config loaded");
        Ok(config)
    }

    /// Tick period in seconds, as used by every sub-step.
    pub fn tick_dt(&self) -> f32 {
        (1.0 / self.tick_rate_hz) as f32
    }

    /// Tick period as a [`Duration`], as used by the clock.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz)
    }

    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), CoreError> {
        fn invalid(field: &str, reason: impl Into<String>) -> CoreError {
            CoreError::InvalidConfig {
                field: field.to_owned(),
                reason: reason.into(),
            }
        }

        if !(self.tick_rate_hz > 0.0 && self.tick_rate_hz.is_finite()) {
            return Err(invalid(
                "tick_rate_hz",
                format!("must be positive and finite, got {}", self.tick_rate_hz),
            ));
        }
        let loco = &self.locomotion;
        if loco.gravity >= 0.0 {
            return Err(invalid("locomotion.gravity", "must be negative"));
        }
        if loco.jump_height < 0.0 {
            return Err(invalid("locomotion.jump_height", "must not be negative"));
        }
        if loco.move_speed < 0.0 || loco.sprint_speed < 0.0 {
            return Err(invalid("locomotion.move_speed", "speeds must not be negative"));
        }
        if loco.rotation_smooth_time < 0.0 {
            return Err(invalid("locomotion.rotation_smooth_time", "must not be negative"));
        }
        if self.camera.bottom_clamp > self.camera.top_clamp {
            return Err(invalid(
                "camera.bottom_clamp",
                format!(
                    "bottom clamp {} is above top clamp {}",
                    self.camera.bottom_clamp, self.camera.top_clamp
                ),
            ));
        }
        if self.net.history_capacity == 0 {
            return Err(invalid("net.history_capacity", "must be at least 1"));
        }
        if self.net.position_epsilon < 0.0 || self.net.yaw_epsilon_degrees < 0.0 {
            return Err(invalid("net.position_epsilon", "thresholds must not be negative"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_60hz() {
        let config = SimConfig::default();
        config.validate().unwrap();
        assert!((config.tick_dt() - 1.0 / 60.0).abs() < f32::EPSILON);
        assert_eq!(config.net.history_capacity, 1024);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config =
            SimConfig::from_json_str(r#"{ "net": { "position_epsilon": 0.1 } }"#).unwrap();
        assert_eq!(config.net.position_epsilon, 0.1);
        assert_eq!(config.net.history_capacity, 1024);
        assert_eq!(config.locomotion.gravity, -15.0);
    }

    #[test]
    fn zero_tick_rate_is_rejected() {
        let err = SimConfig::from_json_str(r#"{ "tick_rate_hz": 0.0 }"#).unwrap_err();
        assert!(matches!(err, CoreError::InvalidConfig { ref field, .. } if field == "tick_rate_hz"));
    }

    #[test]
    fn inverted_camera_clamps_are_rejected() {
        let mut config = SimConfig::default();
        config.camera.bottom_clamp = 80.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = SimConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, CoreError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = SimConfig::from_path("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
