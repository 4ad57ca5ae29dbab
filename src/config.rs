//! Controller configuration components.
//!
//! This module defines the tunables of the player controller: locomotion and
//! inertia, the charge jump, coyote time, air physics, the high-energy buff,
//! the grapple hook and the predicate state machine. It also defines the
//! [`PlayerController`] hub component that every controlled entity carries.

use bevy::prelude::*;

use crate::animation::ClipPlayer;
use crate::effects::MovementModifiers;
use crate::energy::Energy;
use crate::grapple::GrappleHook;
use crate::intent::MovementIntent;
use crate::jump::{ChargeJump, JumpGate};
use crate::locomotion::KineticState;
use crate::machine::PlayerStateMachine;
use crate::sensor::GroundState;

/// Core player controller component.
///
/// This is the **central hub** shared by the controller systems. It holds the
/// gravity the air modifiers reason about and the per-tick acceleration
/// accumulator that physics backends flush into their force components.
///
/// Spawning it pulls in every other per-entity controller component with its
/// default value. A [`GroundSensor`](crate::sensor::GroundSensor) is added on
/// initialization when missing.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
#[require(
    ControllerConfig,
    GrappleConfig,
    MovementIntent,
    GroundState,
    ChargeJump,
    JumpGate,
    Energy,
    KineticState,
    MovementModifiers,
    GrappleHook,
    PlayerStateMachine,
    ClipPlayer
)]
pub struct PlayerController {
    /// Gravity vector affecting this character.
    ///
    /// Must match the gravity the physics engine integrates, since the air
    /// modifiers only add the *extra* pull on top of it.
    pub gravity: Vec3,

    /// Set once controller initialization has run for this entity.
    pub(crate) initialized: bool,

    /// Set once a missing physics body has been reported for this entity.
    pub(crate) missing_body_reported: bool,

    /// Accelerations accumulated this tick.
    pub(crate) accumulated_acceleration: Vec3,

    /// Accelerations flushed to the backend last tick.
    pub(crate) applied_acceleration: Vec3,
}

impl Default for PlayerController {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            initialized: false,
            missing_body_reported: false,
            accumulated_acceleration: Vec3::ZERO,
            applied_acceleration: Vec3::ZERO,
        }
    }
}

impl PlayerController {
    /// Create a new controller with default gravity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new controller with custom gravity.
    pub fn with_gravity(gravity: Vec3) -> Self {
        Self {
            gravity,
            ..default()
        }
    }

    /// Add an acceleration to this tick's accumulator.
    pub fn add_acceleration(&mut self, acceleration: Vec3) {
        self.accumulated_acceleration += acceleration;
    }

    /// Acceleration accumulated so far this tick.
    pub fn accumulated_acceleration(&self) -> Vec3 {
        self.accumulated_acceleration
    }

    /// Start a new tick.
    ///
    /// Returns what was flushed last tick so the backend can take it back
    /// out of its force component, and clears the accumulator.
    pub fn prepare_new_frame(&mut self) -> Vec3 {
        let previous = self.applied_acceleration;
        self.applied_acceleration = Vec3::ZERO;
        self.accumulated_acceleration = Vec3::ZERO;
        previous
    }

    /// Finish the tick.
    ///
    /// Returns the accumulated acceleration and remembers it as applied.
    pub fn finalize_frame(&mut self) -> Vec3 {
        self.applied_acceleration = self.accumulated_acceleration;
        self.accumulated_acceleration
    }
}

/// Configuration parameters for locomotion, jumping, air physics and energy.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct ControllerConfig {
    // === Movement Settings ===
    /// Base horizontal speed (units/second).
    pub move_speed: f32,

    /// Turn rate used to slerp toward the movement heading (per second).
    pub rotation_speed: f32,

    /// Yaw offset in degrees applied after facing the heading.
    ///
    /// Corrects models whose forward axis is not -Z (90 for a model facing
    /// right, 180 for one facing backwards).
    pub model_forward_offset: f32,

    // === Inertia Settings ===
    /// Whether horizontal velocity eases toward the target.
    /// When false the target velocity is applied immediately.
    pub move_inertia: bool,

    /// Acceleration toward the target speed while input is held
    /// (units/second^2, 0 = instant).
    pub move_acceleration: f32,

    /// Deceleration toward rest without input (units/second^2, 0 = instant).
    pub move_deceleration: f32,

    // === Charge Jump Settings ===
    /// Jump impulse released with no charge.
    pub min_jump_force: f32,

    /// Jump impulse released at full charge.
    pub max_jump_force: f32,

    /// Seconds of holding needed to reach `max_jump_force`.
    pub max_charge_time: f32,

    /// Grace period after leaving the ground during which a jump is still allowed.
    pub coyote_time: f32,

    // === Air Physics Settings ===
    /// Enables the fall and low-jump gravity multipliers.
    pub extra_gravity: bool,

    /// Gravity multiplier while falling or near the apex.
    pub fall_gravity_multiplier: f32,

    /// Gravity multiplier while rising without the jump button held.
    pub low_jump_gravity_multiplier: f32,

    /// Enables the hang-time cut.
    pub hang_time_cut: bool,

    /// Seconds after launch before the hang-time cut starts pushing down.
    pub max_hang_time: f32,

    /// Downward acceleration applied by the hang-time cut.
    pub hang_time_down_force: f32,

    /// Enables the fall speed clamp.
    pub fall_speed_clamp: bool,

    /// Maximum fall speed (positive number; applied downward).
    pub max_fall_speed: f32,

    // === High Energy Settings ===
    /// Energy capacity.
    pub max_energy: f32,

    /// Energy drained per second while high-energy mode is on.
    pub energy_consumption_rate: f32,

    /// Energy level at or below which the mode can't be enabled and auto-disables.
    pub min_energy_threshold: f32,

    /// Energy recovered per second while the mode is off (0 = no recharge).
    pub energy_recharge_rate: f32,

    /// Jump force multiplier while high-energy mode is on.
    pub high_energy_jump_multiplier: f32,

    /// Move speed multiplier while high-energy mode is on.
    pub high_energy_speed_multiplier: f32,

    /// Rotation speed multiplier while high-energy mode is on.
    pub high_energy_rotation_multiplier: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            // Movement settings
            move_speed: 5.0,
            rotation_speed: 100.0,
            model_forward_offset: 0.0,

            // Inertia settings
            move_inertia: true,
            move_acceleration: 20.0,
            move_deceleration: 25.0,

            // Charge jump settings
            min_jump_force: 5.0,
            max_jump_force: 15.0,
            max_charge_time: 1.5,
            coyote_time: 0.15,

            // Air physics settings
            extra_gravity: true,
            fall_gravity_multiplier: 2.2,
            low_jump_gravity_multiplier: 1.8,
            hang_time_cut: false,
            max_hang_time: 0.35,
            hang_time_down_force: 25.0,
            fall_speed_clamp: false,
            max_fall_speed: 35.0,

            // High energy settings
            max_energy: 100.0,
            energy_consumption_rate: 10.0,
            min_energy_threshold: 5.0,
            energy_recharge_rate: 0.0,
            high_energy_jump_multiplier: 1.5,
            high_energy_speed_multiplier: 1.3,
            high_energy_rotation_multiplier: 1.2,
        }
    }
}

impl ControllerConfig {
    /// Create a config with snappier air control for experienced players.
    ///
    /// Enables the hang-time cut and the fall speed clamp.
    pub fn tight() -> Self {
        Self {
            hang_time_cut: true,
            fall_speed_clamp: true,
            ..default()
        }
    }

    /// Create a config without movement inertia (input maps straight to velocity).
    pub fn arcade() -> Self {
        Self {
            move_inertia: false,
            ..default()
        }
    }

    /// Return a copy with nonsensical values clamped into range.
    ///
    /// Negative rates become zero, `max_charge_time` stays positive, the jump
    /// force range is ordered and the threshold never exceeds the capacity.
    pub fn sanitized(mut self) -> Self {
        self.move_speed = self.move_speed.max(0.0);
        self.rotation_speed = self.rotation_speed.max(0.0);
        self.move_acceleration = self.move_acceleration.max(0.0);
        self.move_deceleration = self.move_deceleration.max(0.0);
        self.max_charge_time = self.max_charge_time.max(f32::EPSILON);
        self.coyote_time = self.coyote_time.max(0.0);
        if self.min_jump_force > self.max_jump_force {
            std::mem::swap(&mut self.min_jump_force, &mut self.max_jump_force);
        }
        self.max_energy = self.max_energy.max(0.0);
        self.energy_consumption_rate = self.energy_consumption_rate.max(0.0);
        self.energy_recharge_rate = self.energy_recharge_rate.max(0.0);
        self.min_energy_threshold = self.min_energy_threshold.clamp(0.0, self.max_energy);
        self.max_fall_speed = self.max_fall_speed.abs();
        self
    }

    /// Move speed with the high-energy multiplier applied when active.
    #[inline]
    pub fn effective_move_speed(&self, high_energy: bool) -> f32 {
        if high_energy {
            self.move_speed * self.high_energy_speed_multiplier
        } else {
            self.move_speed
        }
    }

    /// Rotation speed with the high-energy multiplier applied when active.
    #[inline]
    pub fn effective_rotation_speed(&self, high_energy: bool) -> f32 {
        if high_energy {
            self.rotation_speed * self.high_energy_rotation_multiplier
        } else {
            self.rotation_speed
        }
    }

    /// Builder: set base move speed.
    pub fn with_move_speed(mut self, speed: f32) -> Self {
        self.move_speed = speed;
        self
    }

    /// Builder: set rotation speed.
    pub fn with_rotation_speed(mut self, speed: f32) -> Self {
        self.rotation_speed = speed;
        self
    }

    /// Builder: set the model yaw offset in degrees.
    pub fn with_model_forward_offset(mut self, degrees: f32) -> Self {
        self.model_forward_offset = degrees;
        self
    }

    /// Builder: set inertia parameters.
    pub fn with_inertia(mut self, acceleration: f32, deceleration: f32) -> Self {
        self.move_inertia = true;
        self.move_acceleration = acceleration;
        self.move_deceleration = deceleration;
        self
    }

    /// Builder: disable inertia.
    pub fn without_inertia(mut self) -> Self {
        self.move_inertia = false;
        self
    }

    /// Builder: set the charge jump range.
    pub fn with_jump_forces(mut self, min: f32, max: f32) -> Self {
        self.min_jump_force = min;
        self.max_jump_force = max;
        self
    }

    /// Builder: set the full-charge time.
    pub fn with_max_charge_time(mut self, seconds: f32) -> Self {
        self.max_charge_time = seconds;
        self
    }

    /// Builder: set coyote time.
    pub fn with_coyote_time(mut self, seconds: f32) -> Self {
        self.coyote_time = seconds;
        self
    }

    /// Builder: set the fall and low-jump gravity multipliers.
    pub fn with_gravity_multipliers(mut self, fall: f32, low_jump: f32) -> Self {
        self.extra_gravity = true;
        self.fall_gravity_multiplier = fall;
        self.low_jump_gravity_multiplier = low_jump;
        self
    }

    /// Builder: enable the hang-time cut.
    pub fn with_hang_time_cut(mut self, max_hang_time: f32, down_force: f32) -> Self {
        self.hang_time_cut = true;
        self.max_hang_time = max_hang_time;
        self.hang_time_down_force = down_force;
        self
    }

    /// Builder: enable the fall speed clamp.
    pub fn with_fall_speed_clamp(mut self, max_fall_speed: f32) -> Self {
        self.fall_speed_clamp = true;
        self.max_fall_speed = max_fall_speed;
        self
    }

    /// Builder: set energy capacity and drain.
    pub fn with_energy(mut self, max_energy: f32, consumption_rate: f32) -> Self {
        self.max_energy = max_energy;
        self.energy_consumption_rate = consumption_rate;
        self
    }

    /// Builder: set passive energy recharge.
    pub fn with_energy_recharge(mut self, rate: f32) -> Self {
        self.energy_recharge_rate = rate;
        self
    }

    /// Builder: set the auto-disable threshold.
    pub fn with_min_energy_threshold(mut self, threshold: f32) -> Self {
        self.min_energy_threshold = threshold;
        self
    }
}

/// Configuration for the grapple hook.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct GrappleConfig {
    /// Maximum range of the grapple ray.
    pub max_distance: f32,

    /// Speed of the cosmetic rope head flying toward the anchor.
    pub hook_speed: f32,

    /// Speed at which the body is pulled toward the anchor.
    pub pull_speed: f32,

    /// Distance to the anchor at which the target counts as reached.
    pub reach_threshold: f32,

    /// Upward velocity added when the player lets go with the jump button.
    pub release_impulse: f32,

    /// Collision groups the grapple ray may hit (memberships, filters).
    /// None = everything.
    pub grapple_groups: Option<(u32, u32)>,

    /// Offset of the rope origin ("gun tip") from the body position.
    pub tip_offset: Vec3,
}

impl Default for GrappleConfig {
    fn default() -> Self {
        Self {
            max_distance: 20.0,
            hook_speed: 40.0,
            pull_speed: 15.0,
            reach_threshold: 1.5,
            release_impulse: 5.0,
            grapple_groups: None,
            tip_offset: Vec3::ZERO,
        }
    }
}

impl GrappleConfig {
    /// Builder: set range.
    pub fn with_max_distance(mut self, distance: f32) -> Self {
        self.max_distance = distance;
        self
    }

    /// Builder: set pull speed.
    pub fn with_pull_speed(mut self, speed: f32) -> Self {
        self.pull_speed = speed;
        self
    }

    /// Builder: set reach threshold.
    pub fn with_reach_threshold(mut self, threshold: f32) -> Self {
        self.reach_threshold = threshold;
        self
    }

    /// Builder: restrict the ray to collision groups.
    pub fn with_groups(mut self, memberships: u32, filters: u32) -> Self {
        self.grapple_groups = Some((memberships, filters));
        self
    }
}

/// Configuration for the predicate state machine.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct StateMachineConfig {
    /// Route Idle→Move and Idle→Charging through the IdleToMove / IdleToCharge clips.
    pub idle_transitions: bool,

    /// Enter TurnLeft / TurnRight when the heading swings past `turn_angle_threshold`.
    pub turn_states: bool,

    /// Heading change in degrees that triggers a turn state.
    pub turn_angle_threshold: f32,

    /// Transition time handed to the animation surface for every clip.
    pub clip_transition_time: f32,

    /// Animation layer used for every clip.
    pub clip_layer: u32,
}

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            idle_transitions: false,
            turn_states: false,
            turn_angle_threshold: 45.0,
            clip_transition_time: 0.1,
            clip_layer: 0,
        }
    }
}

impl StateMachineConfig {
    /// Config with every optional transitional state turned on.
    pub fn full() -> Self {
        Self {
            idle_transitions: true,
            turn_states: true,
            ..default()
        }
    }
}
