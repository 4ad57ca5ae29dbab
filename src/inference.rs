//! Continuous animation-state inference.
//!
//! An alternative to the predicate machine in [`crate::machine`] for games
//! that only want locomotion clips: every tick the target state is inferred
//! from the ground flag, the sign of the vertical velocity and the amount of
//! horizontal movement, then debounced. Add [`AnimationInference`] to a
//! character to use it; the predicate machine then leaves that character's
//! clips alone.

use bevy::prelude::*;

use crate::animation::clips;
use crate::locomotion::signed_yaw_degrees;

/// Inferred animation state.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InferredState {
    #[default]
    Idle,
    Walk,
    Jump,
    Fall,
    TurnLeft,
    TurnRight,
}

impl InferredState {
    pub fn is_air(&self) -> bool {
        matches!(self, Self::Jump | Self::Fall)
    }

    pub fn is_ground_locomotion(&self) -> bool {
        matches!(self, Self::Idle | Self::Walk)
    }

    /// Clip played on entering this state and its transition time.
    pub fn clip(&self) -> (&'static str, f32) {
        match self {
            Self::Idle => (clips::IDLE, 0.1),
            Self::Walk => (clips::MOVE, 0.1),
            Self::Jump => (clips::JUMP, 0.1),
            // Falling reuses the jump clip with a quicker blend
            Self::Fall => (clips::JUMP, 0.05),
            Self::TurnLeft => (clips::TURN_LEFT, 0.1),
            Self::TurnRight => (clips::TURN_RIGHT, 0.1),
        }
    }
}

/// Tuning for [`AnimationInference`].
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct InferenceConfig {
    /// Horizontal speed above which the character counts as walking.
    pub move_speed_threshold: f32,
    /// Use the move direction instead of horizontal speed to decide walking.
    pub use_move_direction: bool,
    /// Minimum seconds between debounced state changes.
    pub state_change_cooldown: f32,
    /// Seconds between ground flag samples for landing detection.
    pub ground_check_delay: f32,
    /// Heading change in degrees that plays a turn clip.
    pub turn_angle_threshold: f32,
    /// Seconds a turn blocks other changes.
    pub turn_duration: f32,
    /// Clip played on touching down after an air state.
    pub landing_clip: String,
    /// Transition time of the landing clip.
    pub landing_transition: f32,
    /// Normalized time before which the landing clip blocks changes.
    pub landing_block_until: f32,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            move_speed_threshold: 0.1,
            use_move_direction: true,
            state_change_cooldown: 0.1,
            ground_check_delay: 0.1,
            turn_angle_threshold: 45.0,
            turn_duration: 0.3,
            landing_clip: clips::LAND.to_string(),
            landing_transition: 0.15,
            landing_block_until: 0.95,
        }
    }
}

/// Inputs for one inference step.
#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceInput {
    pub now: f32,
    pub dt: f32,
    pub move_direction: Vec3,
    pub velocity: Vec3,
    pub grounded: bool,
    pub charging: bool,
    /// Normalized time of the landing clip while it is the current clip.
    pub landing_progress: Option<f32>,
}

/// Result of one inference step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct InferenceOutput {
    /// State change `(from, to)`, if any.
    pub change: Option<(InferredState, InferredState)>,
    /// Whether the landing clip should start.
    pub play_landing: bool,
}

/// Continuous inference state of one character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct AnimationInference {
    pub state: InferredState,
    last_change_time: f32,
    was_charging: bool,
    turn_timer: f32,
    last_forward: Vec3,
    was_grounded: bool,
    last_ground_check: f32,
}

impl Default for AnimationInference {
    fn default() -> Self {
        Self {
            state: InferredState::Idle,
            last_change_time: f32::NEG_INFINITY,
            was_charging: false,
            turn_timer: 0.0,
            last_forward: Vec3::NEG_Z,
            was_grounded: true,
            last_ground_check: f32::NEG_INFINITY,
        }
    }
}

const MOVE_EPSILON: f32 = 0.1;

impl AnimationInference {
    /// Whether a turn clip is still blocking changes.
    pub fn in_turn(&self) -> bool {
        self.turn_timer > 0.0
    }

    /// Run one tick of inference.
    pub fn step(&mut self, input: &InferenceInput, config: &InferenceConfig) -> InferenceOutput {
        let mut output = InferenceOutput::default();
        let state_at_start = self.state;

        if !input.charging {
            if let Some(turn) = self.detect_turn(input, config) {
                output.change = self.change_to(turn, input.now);
            }
        }

        if output.change.is_none() {
            output.change = self.infer(input, config);
        }

        if input.now - self.last_ground_check > config.ground_check_delay {
            if !self.was_grounded && input.grounded && state_at_start.is_air() {
                output.play_landing = true;
            }
            self.was_grounded = input.grounded;
            self.last_ground_check = input.now;
        }

        if input.move_direction.length() > MOVE_EPSILON {
            self.last_forward = input.move_direction.normalize();
        }

        output
    }

    fn detect_turn(&mut self, input: &InferenceInput, config: &InferenceConfig) -> Option<InferredState> {
        if self.turn_timer > 0.0 {
            self.turn_timer -= input.dt;
            return None;
        }
        if !input.grounded || input.move_direction.length() < MOVE_EPSILON {
            return None;
        }

        let angle = signed_yaw_degrees(self.last_forward, input.move_direction);
        if angle.abs() <= config.turn_angle_threshold {
            return None;
        }
        self.turn_timer = config.turn_duration;
        Some(if angle > 0.0 {
            InferredState::TurnLeft
        } else {
            InferredState::TurnRight
        })
    }

    fn infer(&mut self, input: &InferenceInput, config: &InferenceConfig) -> Option<(InferredState, InferredState)> {
        if input.charging {
            self.was_charging = true;
            return None;
        }
        if self.was_charging {
            self.was_charging = false;
            self.last_change_time = f32::NEG_INFINITY;
        }
        if self.in_turn() {
            return None;
        }
        if input
            .landing_progress
            .is_some_and(|progress| progress < config.landing_block_until)
        {
            return None;
        }

        let target = if !input.grounded {
            if input.velocity.y > MOVE_EPSILON {
                InferredState::Jump
            } else {
                InferredState::Fall
            }
        } else {
            let moving = if config.use_move_direction {
                input.move_direction.length() > MOVE_EPSILON
            } else {
                Vec2::new(input.velocity.x, input.velocity.z).length() > config.move_speed_threshold
            };
            if moving {
                InferredState::Walk
            } else {
                InferredState::Idle
            }
        };

        if target == self.state {
            return None;
        }

        let cooled = input.now - self.last_change_time >= config.state_change_cooldown;
        let air_to_ground = self.state.is_air() && target.is_ground_locomotion();
        if cooled || target.is_air() || air_to_ground {
            self.change_to(target, input.now)
        } else {
            None
        }
    }

    fn change_to(&mut self, target: InferredState, now: f32) -> Option<(InferredState, InferredState)> {
        if target == self.state {
            return None;
        }
        let from = self.state;
        self.state = target;
        self.last_change_time = now;
        Some((from, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn ground(now: f32) -> InferenceInput {
        InferenceInput {
            now,
            dt: DT,
            grounded: true,
            ..default()
        }
    }

    #[test]
    fn infers_walk_and_idle() {
        let config = InferenceConfig::default();
        let mut inference = AnimationInference::default();

        let walking = InferenceInput { move_direction: Vec3::NEG_Z, ..ground(1.0) };
        let out = inference.step(&walking, &config);
        assert_eq!(out.change, Some((InferredState::Idle, InferredState::Walk)));

        // Inside the cooldown the switch back is suppressed
        let out = inference.step(&ground(1.05), &config);
        assert_eq!(out.change, None);
        assert_eq!(inference.state, InferredState::Walk);

        let out = inference.step(&ground(1.2), &config);
        assert_eq!(out.change, Some((InferredState::Walk, InferredState::Idle)));
    }

    #[test]
    fn air_states_switch_immediately() {
        let config = InferenceConfig::default();
        let mut inference = AnimationInference::default();
        inference.step(&InferenceInput { move_direction: Vec3::NEG_Z, ..ground(1.0) }, &config);

        let rising = InferenceInput {
            now: 1.01,
            dt: DT,
            velocity: Vec3::Y * 5.0,
            ..default()
        };
        assert_eq!(
            inference.step(&rising, &config).change,
            Some((InferredState::Walk, InferredState::Jump))
        );

        let falling = InferenceInput { now: 1.02, velocity: Vec3::NEG_Y, ..rising };
        assert_eq!(
            inference.step(&falling, &config).change,
            Some((InferredState::Jump, InferredState::Fall))
        );

        // Air to ground is immediate too
        assert_eq!(
            inference.step(&ground(1.03), &config).change,
            Some((InferredState::Fall, InferredState::Idle))
        );
    }

    #[test]
    fn frozen_while_charging() {
        let config = InferenceConfig::default();
        let mut inference = AnimationInference::default();
        let charging = InferenceInput {
            charging: true,
            move_direction: Vec3::NEG_Z,
            ..ground(1.0)
        };
        for i in 0..10 {
            let input = InferenceInput { now: 1.0 + i as f32 * DT, ..charging };
            assert_eq!(inference.step(&input, &config).change, None);
        }
        assert_eq!(inference.state, InferredState::Idle);

        // Charge over: cooldown is reset and the change goes through at once
        let walking = InferenceInput { move_direction: Vec3::NEG_Z, ..ground(1.2) };
        assert_eq!(
            inference.step(&walking, &config).change,
            Some((InferredState::Idle, InferredState::Walk))
        );
    }

    #[test]
    fn sharp_heading_change_plays_turn_and_blocks() {
        let config = InferenceConfig::default();
        let mut inference = AnimationInference::default();
        inference.step(&InferenceInput { move_direction: Vec3::NEG_Z, ..ground(1.0) }, &config);

        // -Z to -X is a left turn
        let left = InferenceInput { move_direction: Vec3::NEG_X, ..ground(1.5) };
        assert_eq!(
            inference.step(&left, &config).change,
            Some((InferredState::Walk, InferredState::TurnLeft))
        );
        assert!(inference.in_turn());

        // Blocked for the turn duration
        let still_left = InferenceInput { now: 1.6, ..left };
        assert_eq!(inference.step(&still_left, &config).change, None);
        assert_eq!(inference.state, InferredState::TurnLeft);
    }

    #[test]
    fn landing_clip_after_air_state_and_blocks_until_done() {
        let config = InferenceConfig::default();
        let mut inference = AnimationInference::default();

        let falling = InferenceInput {
            now: 1.0,
            dt: DT,
            velocity: Vec3::NEG_Y,
            ..default()
        };
        inference.step(&falling, &config);
        assert_eq!(inference.state, InferredState::Fall);

        let out = inference.step(&ground(1.2), &config);
        assert!(out.play_landing);

        let mut inference = AnimationInference {
            state: InferredState::Fall,
            ..default()
        };
        let landing = InferenceInput {
            landing_progress: Some(0.5),
            ..ground(2.0)
        };
        assert_eq!(inference.step(&landing, &config).change, None);
        assert_eq!(inference.state, InferredState::Fall);
    }
}
