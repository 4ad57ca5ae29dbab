//! Locomotion integrator.
//!
//! Turns a resolved move direction into horizontal velocity with optional
//! inertia, and turns the heading into a facing rotation. Vertical velocity is
//! never touched here.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::intent::MOVE_INPUT_THRESHOLD;

/// Per-entity kinetic bookkeeping owned by the locomotion system.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct KineticState {
    /// Resolved world-space move direction this tick (unit or zero).
    pub move_direction: Vec3,

    /// Horizontal velocity written this tick.
    pub horizontal_velocity: Vec3,

    /// Body velocity sampled after this tick's writes.
    pub velocity: Vec3,
}

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
pub fn move_towards(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let delta = target - current;
    let distance = delta.length();
    if distance <= max_delta || distance <= f32::EPSILON {
        target
    } else {
        current + delta / distance * max_delta
    }
}

/// Next horizontal velocity for one fixed tick.
///
/// `current` is the horizontal part of the body velocity, `speed` the already
/// scaled move speed. Zero acceleration or deceleration means instant.
pub fn step_horizontal(
    current: Vec3,
    direction: Vec3,
    speed: f32,
    config: &ControllerConfig,
    dt: f32,
) -> Vec3 {
    let target = direction * speed;
    if !config.move_inertia {
        return target;
    }

    if direction.length() > MOVE_INPUT_THRESHOLD {
        let rate = if config.move_acceleration > 0.0 {
            config.move_acceleration
        } else {
            f32::MAX
        };
        move_towards(current, target, rate * dt)
    } else {
        let rate = if config.move_deceleration > 0.0 {
            config.move_deceleration
        } else {
            f32::MAX
        };
        move_towards(current, Vec3::ZERO, rate * dt)
    }
}

/// Rotation that looks along `heading` with the model yaw offset applied.
pub fn heading_rotation(heading: Vec3, offset_degrees: f32) -> Option<Quat> {
    let flat = Vec3::new(heading.x, 0.0, heading.z).normalize_or_zero();
    if flat == Vec3::ZERO {
        return None;
    }
    let look = Transform::IDENTITY.looking_to(flat, Vec3::Y).rotation;
    Some(look * Quat::from_rotation_y(offset_degrees.to_radians()))
}

/// Slerp the current rotation toward the heading at `rate * dt`.
pub fn facing_rotation(current: Quat, heading: Vec3, offset_degrees: f32, rate: f32, dt: f32) -> Quat {
    match heading_rotation(heading, offset_degrees) {
        Some(target) => current.slerp(target, (rate * dt).clamp(0.0, 1.0)),
        None => current,
    }
}

/// Signed yaw angle in degrees from `from` to `to` around +Y.
///
/// Positive angles turn counter-clockwise seen from above (to the left).
pub fn signed_yaw_degrees(from: Vec3, to: Vec3) -> f32 {
    let a = Vec2::new(from.x, from.z);
    let b = Vec2::new(to.x, to.z);
    if a.length_squared() <= f32::EPSILON || b.length_squared() <= f32::EPSILON {
        return 0.0;
    }
    // Top-down: x right, z toward the viewer, so negate the 2D angle
    -a.angle_to(b).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn move_towards_never_overshoots() {
        let next = move_towards(Vec3::ZERO, Vec3::new(5.0, 0.0, 0.0), 0.5);
        assert!((next.x - 0.5).abs() < 1e-5);

        let next = move_towards(Vec3::new(4.9, 0.0, 0.0), Vec3::new(5.0, 0.0, 0.0), 0.5);
        assert_eq!(next, Vec3::new(5.0, 0.0, 0.0));
    }

    #[test]
    fn acceleration_from_rest_never_exceeds_speed() {
        let config = ControllerConfig::default();
        let speed = config.effective_move_speed(true);
        let mut velocity = Vec3::ZERO;
        let mut previous = 0.0;
        for _ in 0..240 {
            velocity = step_horizontal(velocity, Vec3::X, speed, &config, DT);
            let magnitude = velocity.length();
            assert!(magnitude <= speed + 1e-4);
            assert!(magnitude >= previous);
            previous = magnitude;
        }
        assert!((velocity.length() - speed).abs() < 1e-4);
    }

    #[test]
    fn deceleration_without_input() {
        let config = ControllerConfig::default();
        let velocity = step_horizontal(Vec3::new(5.0, 0.0, 0.0), Vec3::ZERO, 5.0, &config, DT);
        assert!((velocity.x - (5.0 - 25.0 * DT)).abs() < 1e-4);
    }

    #[test]
    fn without_inertia_target_is_immediate() {
        let config = ControllerConfig::arcade();
        let velocity = step_horizontal(Vec3::ZERO, Vec3::Z, 5.0, &config, DT);
        assert_eq!(velocity, Vec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn zero_rates_are_instant() {
        let config = ControllerConfig::default().with_inertia(0.0, 0.0);
        assert_eq!(step_horizontal(Vec3::ZERO, Vec3::X, 5.0, &config, DT), Vec3::X * 5.0);
        assert_eq!(step_horizontal(Vec3::X * 5.0, Vec3::ZERO, 5.0, &config, DT), Vec3::ZERO);
    }

    #[test]
    fn heading_rotation_faces_direction() {
        let rotation = heading_rotation(Vec3::X, 0.0).expect("non-zero heading");
        assert!((rotation * Vec3::NEG_Z - Vec3::X).length() < 1e-4);

        // 180 degree offset faces the model backwards
        let rotation = heading_rotation(Vec3::X, 180.0).expect("non-zero heading");
        assert!((rotation * Vec3::NEG_Z - Vec3::NEG_X).length() < 1e-4);

        assert!(heading_rotation(Vec3::Y, 0.0).is_none());
    }

    #[test]
    fn facing_rotation_converges() {
        let mut rotation = Quat::IDENTITY;
        for _ in 0..10 {
            rotation = facing_rotation(rotation, Vec3::X, 0.0, 100.0, DT);
        }
        assert!((rotation * Vec3::NEG_Z - Vec3::X).length() < 1e-3);
    }

    #[test]
    fn signed_yaw_turns() {
        // Facing -Z, turning to -X is a left turn
        assert!((signed_yaw_degrees(Vec3::NEG_Z, Vec3::NEG_X) - 90.0).abs() < 1e-3);
        assert!((signed_yaw_degrees(Vec3::NEG_Z, Vec3::X) + 90.0).abs() < 1e-3);
        assert_eq!(signed_yaw_degrees(Vec3::ZERO, Vec3::X), 0.0);
    }
}
