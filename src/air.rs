//! Air physics modifiers.
//!
//! Extra pull on top of the physics engine's own gravity while airborne:
//! a stronger fall, a shorter jump when the button is let go early, an
//! optional hang-time cut and an optional fall speed clamp. Everything here is
//! a pure function of the tick's inputs; the system in `systems` applies the
//! result as an acceleration.

use crate::config::ControllerConfig;

/// Vertical speed at or below which the character counts as falling.
pub const APEX_EPSILON: f32 = 0.1;

/// Inputs for one airborne tick.
#[derive(Debug, Clone, Copy)]
pub struct AirInput {
    /// Current vertical velocity.
    pub vertical_velocity: f32,
    /// Vertical component of gravity (negative for downward gravity).
    pub gravity_y: f32,
    /// Whether the jump button is held.
    pub jump_held: bool,
    /// Seconds since the last launch, if the character jumped and has not landed.
    pub time_since_launch: Option<f32>,
}

/// Extra vertical acceleration for this airborne tick.
pub fn air_acceleration(input: AirInput, config: &ControllerConfig) -> f32 {
    let mut acceleration = 0.0;

    if config.extra_gravity {
        if input.vertical_velocity <= APEX_EPSILON {
            acceleration += input.gravity_y * (config.fall_gravity_multiplier.max(1.0) - 1.0);
        } else if !input.jump_held {
            acceleration += input.gravity_y * (config.low_jump_gravity_multiplier.max(1.0) - 1.0);
        }
    }

    if config.hang_time_cut && input.vertical_velocity > 0.0 {
        if let Some(elapsed) = input.time_since_launch {
            if elapsed >= config.max_hang_time {
                acceleration -= config.hang_time_down_force;
            }
        }
    }

    acceleration
}

/// Clamp a vertical velocity to the configured maximum fall speed.
///
/// Returns `None` when the clamp is disabled or not needed.
pub fn clamp_fall_speed(vertical_velocity: f32, config: &ControllerConfig) -> Option<f32> {
    if !config.fall_speed_clamp {
        return None;
    }
    let limit = -config.max_fall_speed.abs();
    (vertical_velocity < limit).then_some(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const G: f32 = -9.81;

    fn input(vy: f32, held: bool) -> AirInput {
        AirInput {
            vertical_velocity: vy,
            gravity_y: G,
            jump_held: held,
            time_since_launch: None,
        }
    }

    #[test]
    fn falling_uses_fall_multiplier() {
        let config = ControllerConfig::default();
        let a = air_acceleration(input(-3.0, true), &config);
        assert!((a - G * 1.2).abs() < 1e-4);

        // Near apex counts as falling
        let a = air_acceleration(input(0.05, true), &config);
        assert!((a - G * 1.2).abs() < 1e-4);
    }

    #[test]
    fn rising_without_jump_held_uses_low_jump_multiplier() {
        let config = ControllerConfig::default();
        let a = air_acceleration(input(4.0, false), &config);
        assert!((a - G * 0.8).abs() < 1e-4);
    }

    #[test]
    fn rising_with_jump_held_adds_nothing() {
        let config = ControllerConfig::default();
        assert_eq!(air_acceleration(input(4.0, true), &config), 0.0);
    }

    #[test]
    fn multipliers_below_one_are_ignored() {
        let config = ControllerConfig::default().with_gravity_multipliers(0.5, 0.2);
        assert_eq!(air_acceleration(input(-1.0, false), &config), 0.0);
        assert_eq!(air_acceleration(input(1.0, false), &config), 0.0);
    }

    #[test]
    fn hang_time_cut_after_delay() {
        let config = ControllerConfig::default().with_hang_time_cut(0.35, 25.0);
        let mut air = input(2.0, true);

        air.time_since_launch = Some(0.2);
        assert_eq!(air_acceleration(air, &config), 0.0);

        air.time_since_launch = Some(0.35);
        assert_eq!(air_acceleration(air, &config), -25.0);

        // Only while ascending
        air.vertical_velocity = -1.0;
        let a = air_acceleration(air, &config);
        assert!((a - G * 1.2).abs() < 1e-4);
    }

    #[test]
    fn fall_clamp() {
        let config = ControllerConfig::default().with_fall_speed_clamp(35.0);
        assert_eq!(clamp_fall_speed(-50.0, &config), Some(-35.0));
        assert_eq!(clamp_fall_speed(-20.0, &config), None);
        assert_eq!(clamp_fall_speed(-50.0, &ControllerConfig::default()), None);
    }
}
