//! Orbit camera sub-step.
//!
//! The camera slice stores raw accumulated angles. The static pitch override
//! is only applied by [`orientation`], so that the stored state stays a pure
//! function of look input.

use serde::{Deserialize, Serialize};

use riposte_core::config::CameraConfig;
use riposte_core::input::LookInput;
use riposte_core::math::clamp_angle;
use riposte_core::state::CameraState;

/// Stage name of the camera sub-step.
pub const CAMERA_STAGE: &str = "camera";

/// Externally consumed camera orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CameraOrientation {
    pub pitch: f32,
    pub yaw: f32,
}

/// Advance the camera slice by one tick of look input.
pub fn run_camera_step(prev: &CameraState, look: &LookInput, config: &CameraConfig, dt: f32) -> CameraState {
    let mut yaw = prev.yaw;
    let mut pitch = prev.pitch;

    if look.delta.length_squared() >= config.look_threshold && !config.lock_camera_position {
        let multiplier = if look.pointer { 1.0 } else { dt };
        yaw += look.delta.x * multiplier;
        pitch += look.delta.y * multiplier;
    }

    CameraState {
        yaw: clamp_angle(yaw, f32::MIN, f32::MAX),
        pitch: clamp_angle(pitch, config.bottom_clamp, config.top_clamp),
    }
}

/// The orientation handed to rendering: stored angles plus the pitch
/// override.
pub fn orientation(state: &CameraState, config: &CameraConfig) -> CameraOrientation {
    CameraOrientation {
        pitch: state.pitch + config.angle_override,
        yaw: state.yaw,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
