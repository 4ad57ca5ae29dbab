//! # `updraft_controller`
//!
//! A 3D charge-jump platformer character controller with physics backend abstraction.
//!
//! This crate provides a physics-driven player controller that:
//! - Probes the ground with a five-ray sensor and tracks coyote time
//! - Charges jumps while the button is held, including pre-charging in the air
//! - Shapes airborne arcs with fall and low-jump gravity, hang-time cut and a fall clamp
//! - Runs a high-energy buff mode that drains an energy resource
//! - Pulls the player along a grapple hook that owns the body velocity while anchored
//! - Drives animation clips from a predicate state machine or a continuous inference variant
//! - Abstracts the physics backend (Rapier3D included)
//!
//! ## Architecture
//!
//! Input is sampled once per rendered frame into [`intent::MovementIntent`],
//! with button edges latched until a fixed tick consumes them. All gameplay
//! runs in `FixedUpdate`, ordered by [`ControllerSet`]:
//! 1. Sensors refresh the ground state
//! 2. Effects, move direction, energy and the charge jump consume intent
//! 3. Locomotion writes horizontal velocity, air physics adds vertical pull
//! 4. An anchored grapple overrides the whole velocity
//! 5. The state machine picks the clip to play
//!
//! ## Usage
//!
//! ```rust
//! use bevy::prelude::*;
//! use updraft_controller::prelude::*;
//!
//! // Spawning a PlayerController pulls in every other controller component
//! let controller = PlayerController::new();
//! let config = ControllerConfig::default().with_jump_forces(6.0, 16.0);
//! let mut intent = MovementIntent::default();
//! intent.set_move_axes(Vec2::Y);
//! ```

use bevy::prelude::*;

pub mod air;
pub mod animation;
pub mod backend;
pub mod config;
pub mod effects;
pub mod energy;
pub mod grapple;
pub mod inference;
pub mod input;
pub mod intent;
pub mod jump;
pub mod locomotion;
pub mod machine;
pub mod queries;
pub mod sensor;
pub mod state;
pub mod systems;

#[cfg(feature = "rapier3d")]
pub mod rapier;

pub mod prelude {
    //! Convenient re-exports for common usage.

    pub use crate::animation::{ClipLibrary, ClipPlayer, ClipRequested, SoundCue};
    pub use crate::backend::CharacterPhysicsBackend;
    pub use crate::config::{ControllerConfig, GrappleConfig, PlayerController, StateMachineConfig};
    pub use crate::effects::{EffectKind, MovementModifiers, PlayerEffect};
    pub use crate::energy::{Energy, HighEnergyChanged};
    pub use crate::grapple::{GrappleEnded, GrappleHook, GrappleStarted};
    pub use crate::inference::{AnimationInference, InferenceConfig, InferredState};
    pub use crate::input::{InputBindings, PlayerCamera};
    pub use crate::intent::MovementIntent;
    pub use crate::jump::{ChargeJump, JumpGate, JumpLaunched};
    pub use crate::locomotion::KineticState;
    pub use crate::machine::{PlayerState, PlayerStateMachine};
    pub use crate::queries::PlayerQuery;
    pub use crate::sensor::{GroundSensor, GroundState};
    pub use crate::state::{Airborne, Grounded};
    pub use crate::{ControllerClock, ControllerSet, PlayerControllerPlugin};

    #[cfg(feature = "rapier3d")]
    pub use crate::rapier::{Rapier3dBackend, Rapier3dCharacterBundle};
}

/// System sets for the controller's fixed tick, run in this order.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControllerSet {
    /// Clock, initialization, force bookkeeping.
    Preparation,
    /// Backend scene queries (ground probes, grapple ray).
    Sensors,
    /// External effects and move direction resolution.
    Intent,
    /// High-energy toggle, drain and recharge.
    Energy,
    /// Charge jump.
    Jump,
    /// Horizontal locomotion and facing.
    Movement,
    /// Airborne gravity modifiers and fall clamp.
    AirPhysics,
    /// Grapple pull, exclusive velocity owner while anchored.
    Grapple,
    /// Clip clock and state machines.
    StateMachine,
    /// Flush to the physics backend and clear consumed edges.
    FinalApplication,
}

/// Deterministic gameplay clock advanced once per fixed tick.
///
/// Coyote time, hang time and slow zone lingers compare against this clock,
/// never against wall time.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct ControllerClock {
    elapsed: f32,
    delta: f32,
}

impl ControllerClock {
    /// Seconds of fixed ticks run so far.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Length of the current tick.
    pub fn delta(&self) -> f32 {
        self.delta
    }

    pub fn tick(&mut self, dt: f32) {
        self.delta = dt;
        self.elapsed += dt;
    }
}

/// Main plugin for the player controller.
///
/// This plugin is generic over a physics backend `B` which provides the actual
/// physics operations (velocity writes, impulses, accelerations) and registers
/// its own scene query systems.
///
/// # Examples
///
/// With the Rapier3D backend:
/// ```rust,no_run
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use updraft_controller::prelude::*;
///
/// App::new()
///     .add_plugins(DefaultPlugins)
///     .add_plugins(RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule())
///     .add_plugins(PlayerControllerPlugin::<Rapier3dBackend>::default())
///     .run();
/// ```
pub struct PlayerControllerPlugin<B: backend::CharacterPhysicsBackend> {
    _marker: std::marker::PhantomData<B>,
}

impl<B: backend::CharacterPhysicsBackend> Default for PlayerControllerPlugin<B> {
    fn default() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }
}

impl<B: backend::CharacterPhysicsBackend> Plugin for PlayerControllerPlugin<B> {
    fn build(&self, app: &mut App) {
        // Register core types
        app.register_type::<config::PlayerController>();
        app.register_type::<config::ControllerConfig>();
        app.register_type::<config::GrappleConfig>();
        app.register_type::<config::StateMachineConfig>();
        app.register_type::<intent::MovementIntent>();
        app.register_type::<input::InputBindings>();
        app.register_type::<input::PlayerCamera>();
        app.register_type::<sensor::GroundSensor>();
        app.register_type::<sensor::GroundState>();
        app.register_type::<state::Grounded>();
        app.register_type::<state::Airborne>();
        app.register_type::<jump::ChargeJump>();
        app.register_type::<jump::JumpGate>();
        app.register_type::<energy::Energy>();
        app.register_type::<locomotion::KineticState>();
        app.register_type::<effects::MovementModifiers>();
        app.register_type::<grapple::GrappleHook>();
        app.register_type::<machine::PlayerStateMachine>();
        app.register_type::<inference::AnimationInference>();
        app.register_type::<inference::InferenceConfig>();
        app.register_type::<animation::ClipPlayer>();

        app.init_resource::<ControllerClock>();
        app.init_resource::<animation::ClipLibrary>();

        app.add_event::<effects::PlayerEffect>();
        app.add_event::<energy::HighEnergyChanged>();
        app.add_event::<jump::JumpLaunched>();
        app.add_event::<grapple::GrappleStarted>();
        app.add_event::<grapple::GrappleEnded>();
        app.add_event::<animation::ClipRequested>();
        app.add_event::<animation::SoundCue>();

        app.configure_sets(
            FixedUpdate,
            (
                ControllerSet::Preparation,
                ControllerSet::Sensors,
                ControllerSet::Intent,
                ControllerSet::Energy,
                ControllerSet::Jump,
                ControllerSet::Movement,
                ControllerSet::AirPhysics,
                ControllerSet::Grapple,
                ControllerSet::StateMachine,
                ControllerSet::FinalApplication,
            )
                .chain(),
        );

        // Add the physics backend plugin
        app.add_plugins(B::plugin());

        app.add_systems(
            FixedUpdate,
            (
                (
                    systems::advance_controller_clock::<B>,
                    systems::initialize_controllers,
                    systems::report_missing_bodies::<B>,
                )
                    .chain()
                    .in_set(ControllerSet::Preparation),
                (systems::apply_player_effects::<B>, systems::resolve_move_directions)
                    .chain()
                    .in_set(ControllerSet::Intent),
                systems::update_energy.in_set(ControllerSet::Energy),
                systems::apply_charge_jump::<B>.in_set(ControllerSet::Jump),
                systems::apply_locomotion::<B>.in_set(ControllerSet::Movement),
                systems::apply_air_physics::<B>.in_set(ControllerSet::AirPhysics),
                systems::apply_grapple_pull::<B>.in_set(ControllerSet::Grapple),
                (
                    systems::sample_velocity::<B>,
                    systems::sync_state_markers,
                    animation::advance_clip_players,
                    systems::update_state_machine,
                    systems::update_animation_inference,
                )
                    .chain()
                    .in_set(ControllerSet::StateMachine),
                systems::consume_intent_edges.in_set(ControllerSet::FinalApplication),
            ),
        );

        // After bevy's input processing, before this frame's fixed ticks
        app.add_systems(
            PreUpdate,
            input::sample_keyboard_input.after(bevy::input::InputSystem),
        );
        app.add_systems(Update, grapple::update_grapple_visuals);
    }
}
