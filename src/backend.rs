//! Physics backend abstraction.
//!
//! This module defines the trait that physics backends must implement
//! to work with the player controller. Every write to a body's velocity goes
//! through this trait, which keeps the single-writer hand-off between the
//! controller systems in one place and allows swapping physics engines.

use bevy::prelude::*;

/// Trait for physics backend implementations.
///
/// Implement this trait to integrate a physics engine with the controller.
/// Scene queries (ground probes, grapple rays) are not part of the trait: the
/// backend plugin registers its own systems in
/// [`ControllerSet::Sensors`](crate::ControllerSet::Sensors) and writes the
/// results into [`GroundState`](crate::sensor::GroundState) and
/// [`GrappleHook`](crate::grapple::GrappleHook).
///
/// For an example implementation, see the `rapier` module's `Rapier3dBackend`.
pub trait CharacterPhysicsBackend: 'static + Send + Sync {
    /// Returns the plugin that sets up this backend.
    fn plugin() -> impl Plugin;

    /// Whether the entity has an initialized physics body.
    ///
    /// Systems skip their physics writes for the tick when this is false.
    fn has_body(world: &World, entity: Entity) -> bool;

    /// Get the current linear velocity of an entity.
    fn get_velocity(world: &World, entity: Entity) -> Vec3;

    /// Set the linear velocity of an entity.
    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3);

    /// Apply an impulse to an entity.
    ///
    /// The impulse is expressed as a velocity change (mass independent), the
    /// same way jump forces are tuned.
    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3);

    /// Apply an acceleration to an entity for the current physics step.
    ///
    /// Accelerations are mass independent and compose with the engine's own
    /// gravity.
    fn apply_acceleration(world: &mut World, entity: Entity, acceleration: Vec3);

    /// Get the current position of an entity.
    fn get_position(world: &World, entity: Entity) -> Vec3;

    /// Get the current rotation of an entity.
    fn get_rotation(world: &World, entity: Entity) -> Quat;

    /// Set the rotation of an entity.
    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat);

    /// Get the fixed timestep delta time.
    fn get_fixed_timestep(world: &World) -> f32 {
        world
            .get_resource::<Time<Fixed>>()
            .map(|t| t.delta_secs())
            .filter(|&d| d > 0.0)
            .unwrap_or(1.0 / 60.0)
    }

    /// Get the mass of an entity.
    fn get_mass(_world: &World, _entity: Entity) -> f32 {
        // Default implementation returns 1.0 (no scaling)
        1.0
    }
}

/// Helper struct for building raycasts.
#[derive(Debug, Clone, Copy)]
pub struct RaycastRequest {
    /// Origin point of the ray.
    pub origin: Vec3,
    /// Direction of the ray (normalized).
    pub direction: Vec3,
    /// Maximum distance to cast.
    pub max_distance: f32,
    /// Entity to exclude from results.
    pub exclude: Option<Entity>,
}

impl RaycastRequest {
    /// Create a new raycast request.
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
            max_distance,
            exclude: None,
        }
    }

    /// Exclude an entity from the raycast.
    pub fn excluding(mut self, entity: Entity) -> Self {
        self.exclude = Some(entity);
        self
    }
}

/// First hit along a [`RaycastRequest`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub entity: Entity,
    pub point: Vec3,
    pub normal: Vec3,
    /// Distance along the ray.
    pub distance: f32,
}
