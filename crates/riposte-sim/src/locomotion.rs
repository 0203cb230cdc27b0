//! Character-controller sub-steps: gravity/jump, grounded check, movement.
//!
//! Each sub-step is a pure function of the previous slice, the tick input and
//! the collaborator results, so that the pipeline can be replayed from any
//! buffered state.
//!
//! # Grounded timing
//!
//! The gravity sub-step reads the grounded flag of the *previous* tick, and
//! the grounded check probes the position the entity held at the start of the
//! tick. Both therefore see the world as it was before this tick's motion.

use riposte_core::config::LocomotionConfig;
use riposte_core::ids::{EntityId, LayerMask};
use riposte_core::input::MoveInput;
use riposte_core::math::{
    forward_from_yaw, lerp, round_to, smooth_damp_angle, wrap_degrees, yaw_from_direction, Vec3,
};
use riposte_core::state::{JumpState, MovementState};

use crate::oracle::{GroundOracle, MotionResolver};

/// Stage name of the gravity/jump sub-step.
pub const GRAVITY_STAGE: &str = "gravity";
/// Stage name of the grounded check.
pub const GROUNDED_STAGE: &str = "grounded";
/// Stage name of the movement + rotation sub-step.
pub const MOVEMENT_STAGE: &str = "movement";

// ---------------------------------------------------------------------------
// Gravity / jump
// ---------------------------------------------------------------------------

/// Animation signals raised by the gravity/jump sub-step. `None` leaves the
/// parameter as it was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JumpSignals {
    pub jump: Option<bool>,
    pub free_fall: Option<bool>,
}

/// Launch velocity reaching exactly `jump_height` under `gravity`.
pub fn jump_velocity(config: &LocomotionConfig) -> f32 {
    (config.jump_height * -2.0 * config.gravity).sqrt()
}

/// Advance the jump slice by one tick.
///
/// `grounded` is the grounded flag of the previous tick.
pub fn run_gravity_step(
    prev: &JumpState,
    grounded: bool,
    jump_pressed: bool,
    config: &LocomotionConfig,
    dt: f32,
) -> (JumpState, JumpSignals) {
    let mut next = JumpState { jump: false, ..*prev };
    let mut signals = JumpSignals::default();

    if grounded {
        next.fall_timeout = config.fall_timeout;
        signals.jump = Some(false);
        signals.free_fall = Some(false);

        if next.vertical_velocity < 0.0 {
            next.vertical_velocity = config.grounded_velocity;
        }
        if jump_pressed && next.jump_timeout <= 0.0 {
            next.vertical_velocity = jump_velocity(config);
            next.jump = true;
            signals.jump = Some(true);
        }
        if next.jump_timeout >= 0.0 {
            next.jump_timeout -= dt;
        }
    } else {
        next.jump_timeout = config.jump_timeout;
        if next.fall_timeout >= 0.0 {
            next.fall_timeout -= dt;
        } else {
            signals.free_fall = Some(true);
        }
    }

    if next.vertical_velocity < config.terminal_velocity {
        next.vertical_velocity += config.gravity * dt;
    }
    (next, signals)
}

// ---------------------------------------------------------------------------
// Grounded check
// ---------------------------------------------------------------------------

/// Center of the ground probe sphere for an entity at `position`.
pub fn ground_probe_center(position: Vec3, config: &LocomotionConfig) -> Vec3 {
    Vec3::new(position.x, position.y - config.grounded_offset, position.z)
}

/// Probe the ground under `position`.
pub fn run_grounded_check(ground: &dyn GroundOracle, position: Vec3, config: &LocomotionConfig) -> bool {
    ground.check_sphere(
        ground_probe_center(position, config),
        config.grounded_radius,
        LayerMask::GROUND,
    )
}

// ---------------------------------------------------------------------------
// Movement + rotation
// ---------------------------------------------------------------------------

/// Combat locks read from the animation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MovementLocks {
    /// Target speed is forced to zero.
    pub movement: bool,
    /// Facing cannot change.
    pub rotation: bool,
}

impl MovementLocks {
    /// Locks derived from the combat flags: attacking or reacting to a hit
    /// pins the feet; attacking outside a combo window pins the facing too.
    pub fn from_flags(attacking: bool, can_combo: bool, taking_damage: bool) -> Self {
        Self {
            movement: attacking || taking_damage,
            rotation: attacking && !can_combo,
        }
    }
}

/// Movement result plus the analog magnitude forwarded to animation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementOutput {
    pub state: MovementState,
    pub motion_speed: f32,
}

/// Advance the movement slice by one tick.
///
/// `camera_yaw` is the camera yaw the move input is relative to, and
/// `vertical_velocity` comes from this tick's gravity sub-step.
#[allow(clippy::too_many_arguments)]
pub fn run_movement_step(
    entity: EntityId,
    prev: &MovementState,
    vertical_velocity: f32,
    input: &MoveInput,
    camera_yaw: f32,
    locks: MovementLocks,
    config: &LocomotionConfig,
    dt: f32,
    motion: &dyn MotionResolver,
) -> MovementOutput {
    let has_input = !input.direction.is_zero();

    let mut target_speed = if input.sprint {
        config.sprint_speed
    } else {
        config.move_speed
    };
    if !has_input || locks.movement {
        target_speed = 0.0;
    }

    let current_speed = (prev.position - prev.previous_position).horizontal_length() / dt;
    let input_magnitude = if config.analog_movement {
        input.magnitude()
    } else {
        1.0
    };

    let rate = dt * config.speed_change_rate;
    let speed = if (current_speed - target_speed).abs() > config.speed_offset {
        round_to(lerp(current_speed, target_speed * input_magnitude, rate), 3)
    } else {
        target_speed
    };

    let mut animation_blend = lerp(prev.animation_blend, target_speed, rate);
    if animation_blend < config.blend_snap {
        animation_blend = 0.0;
    }

    let mut rotation_velocity = prev.rotation_velocity;
    let mut yaw = prev.yaw;
    let mut target_yaw = prev.target_yaw;
    if has_input {
        target_yaw = if locks.rotation {
            prev.yaw
        } else {
            wrap_degrees(yaw_from_direction(input.direction) + camera_yaw)
        };
        yaw = wrap_degrees(smooth_damp_angle(
            prev.yaw,
            target_yaw,
            &mut rotation_velocity,
            config.rotation_smooth_time,
            dt,
        ));
    }

    let displacement =
        forward_from_yaw(target_yaw) * (speed * dt) + Vec3::UP * (vertical_velocity * dt);
    let position = motion.resolve(entity, prev.position, displacement);

    MovementOutput {
        state: MovementState {
            speed,
            animation_blend,
            rotation_velocity,
            position,
            previous_position: prev.position,
            yaw,
            target_yaw,
            camera_reference_yaw: camera_yaw,
        },
        motion_speed: input_magnitude,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
