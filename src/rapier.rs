//! Rapier3D physics backend implementation.
//!
//! This module provides the physics backend for Bevy Rapier3D.
//! Enable with the `rapier3d` feature.
//!
//! Run Rapier in the fixed schedule
//! (`RapierPhysicsPlugin::<NoUserData>::default().in_fixed_schedule()`) so the
//! controller's writes are integrated in the same tick they are made.

use bevy::prelude::*;
use bevy_rapier3d::geometry::Group;
use bevy_rapier3d::prelude::*;

use crate::backend::{CharacterPhysicsBackend, RaycastHit, RaycastRequest};
use crate::config::{GrappleConfig, PlayerController};
use crate::grapple::{gun_tip, GrappleHook, GrappleStarted};
use crate::input::PlayerCamera;
use crate::intent::MovementIntent;
use crate::sensor::{GroundSensor, GroundState};
use crate::{ControllerClock, ControllerSet};

/// Rapier3D physics backend for the player controller.
///
/// This backend uses `bevy_rapier3d` for velocity writes, impulses and
/// forces. Ground probes and the grapple ray are handled by dedicated Rapier
/// systems that receive `RapierContext` as a system parameter.
pub struct Rapier3dBackend;

impl CharacterPhysicsBackend for Rapier3dBackend {
    fn plugin() -> impl Plugin {
        Rapier3dBackendPlugin
    }

    fn has_body(world: &World, entity: Entity) -> bool {
        world.get::<RigidBody>(entity).is_some() && world.get::<Velocity>(entity).is_some()
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Velocity>(entity)
            .map(|v| v.linvel)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            vel.linvel = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        let mass = Self::get_mass(world, entity);
        if let Some(mut ext_impulse) = world.get_mut::<ExternalImpulse>(entity) {
            ext_impulse.impulse += impulse * mass;
        } else if let Some(mut vel) = world.get_mut::<Velocity>(entity) {
            // Fallback: apply as velocity change if no ExternalImpulse component
            vel.linvel += impulse;
        }
    }

    fn apply_acceleration(world: &mut World, entity: Entity, acceleration: Vec3) {
        // Accumulated here, flushed into ExternalForce by apply_controller_forces
        if let Some(mut controller) = world.get_mut::<PlayerController>(entity) {
            controller.add_acceleration(acceleration);
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
            .or_else(|| world.get::<GlobalTransform>(entity).map(|t| t.translation()))
            .unwrap_or(Vec3::ZERO)
    }

    fn get_rotation(world: &World, entity: Entity) -> Quat {
        world
            .get::<Transform>(entity)
            .map(|t| t.rotation)
            .unwrap_or(Quat::IDENTITY)
    }

    fn set_rotation(world: &mut World, entity: Entity, rotation: Quat) {
        if let Some(mut transform) = world.get_mut::<Transform>(entity) {
            transform.rotation = rotation;
        }
    }

    fn get_mass(world: &World, entity: Entity) -> f32 {
        world
            .get::<ReadMassProperties>(entity)
            .map(|props| props.mass)
            .filter(|mass| *mass > 0.0 && mass.is_finite())
            .unwrap_or(1.0)
    }
}

/// Force this controller added to `ExternalForce` on the last tick.
///
/// Kept separately so the next tick can take exactly that share back out and
/// leave forces written by other game code alone.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct ControllerForces {
    pub applied: Vec3,
}

/// Plugin that sets up Rapier3D-specific systems for the player controller.
pub struct Rapier3dBackendPlugin;

impl Plugin for Rapier3dBackendPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<ControllerForces>();

        // Preparation: take last tick's forces back out
        app.add_systems(
            FixedUpdate,
            clear_controller_forces.in_set(ControllerSet::Preparation),
        );

        // Sensors: scene queries
        app.add_systems(
            FixedUpdate,
            (rapier_ground_detection, rapier_grapple_fire)
                .chain()
                .in_set(ControllerSet::Sensors),
        );

        // Final application: flush this tick's accelerations
        app.add_systems(
            FixedUpdate,
            apply_controller_forces.in_set(ControllerSet::FinalApplication),
        );
    }
}

fn collision_groups(groups: Option<(u32, u32)>) -> Option<(Group, Group)> {
    groups.map(|(memberships, filters)| {
        (
            Group::from_bits_truncate(memberships),
            Group::from_bits_truncate(filters),
        )
    })
}

/// Perform a raycast using RapierContext.
fn rapier_raycast(
    context: &RapierContext,
    request: &RaycastRequest,
    collision_groups: Option<(Group, Group)>,
) -> Option<RaycastHit> {
    let mut filter = QueryFilter::default().exclude_sensors();
    if let Some(entity) = request.exclude {
        filter = filter.exclude_rigid_body(entity);
    }
    if let Some((memberships, filters)) = collision_groups {
        filter = filter.groups(CollisionGroups::new(memberships, filters));
    }

    context
        .cast_ray_and_get_normal(
            request.origin,
            request.direction,
            request.max_distance,
            true,
            filter,
        )
        .map(|(entity, hit)| RaycastHit {
            entity,
            point: hit.point,
            normal: hit.normal,
            distance: hit.time_of_impact,
        })
}

/// Five-probe ground check.
///
/// Grounded when any probe hits within the probe distance. Probes exclude the
/// body itself and sensor colliders.
fn rapier_ground_detection(
    rapier_context: ReadRapierContext,
    clock: Res<ControllerClock>,
    mut q_players: Query<(Entity, &GlobalTransform, &GroundSensor, &mut GroundState)>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };

    for (entity, transform, sensor, mut ground) in &mut q_players {
        let groups = collision_groups(sensor.ground_groups);
        let grounded = sensor
            .probe_requests(transform.translation(), entity)
            .iter()
            .any(|request| rapier_raycast(&context, request, groups).is_some());
        ground.record(grounded, clock.elapsed());
    }
}

/// Fire the grapple ray from the centre of the player camera.
///
/// Without a camera the ray leaves the body along its facing.
fn rapier_grapple_fire(
    rapier_context: ReadRapierContext,
    q_camera: Query<&GlobalTransform, With<PlayerCamera>>,
    mut q_players: Query<(
        Entity,
        &GlobalTransform,
        &GrappleConfig,
        &mut MovementIntent,
        &mut GrappleHook,
    )>,
    mut started: EventWriter<GrappleStarted>,
) {
    let Ok(context) = rapier_context.single() else {
        return;
    };
    let camera = q_camera.single().ok();

    for (entity, transform, config, mut intent, mut hook) in &mut q_players {
        if !intent.take_grapple_request() || hook.is_active() {
            continue;
        }

        let (origin, direction) = match camera {
            Some(camera) => (camera.translation(), camera.forward().as_vec3()),
            None => (transform.translation(), transform.forward().as_vec3()),
        };
        let request = RaycastRequest::new(origin, direction, config.max_distance).excluding(entity);
        let hit = rapier_raycast(&context, &request, collision_groups(config.grapple_groups));

        let (_, rotation, position) = transform.to_scale_rotation_translation();
        let tip = gun_tip(position, rotation, config);
        match hook.try_fire(hit.map(|h| h.point), tip) {
            Some(anchor) => {
                debug!("{entity}: grapple anchored at {anchor}");
                started.write(GrappleStarted { entity, anchor });
            }
            None => debug!("{entity}: grapple missed"),
        }
    }
}

/// Clear controller forces at the start of each tick.
///
/// Subtracts the force this controller added last tick from ExternalForce
/// and clears the accumulator, so external user forces are preserved.
pub fn clear_controller_forces(
    mut q: Query<(&mut ExternalForce, &mut ControllerForces, &mut PlayerController)>,
) {
    for (mut ext_force, mut forces, mut controller) in &mut q {
        controller.prepare_new_frame();
        ext_force.force -= forces.applied;
        forces.applied = Vec3::ZERO;
    }
}

/// Apply controller accelerations at the end of each tick.
///
/// Accelerations are scaled by the body mass and stored for next tick's
/// subtraction.
pub fn apply_controller_forces(
    mut q: Query<(
        &mut ExternalForce,
        &mut ControllerForces,
        &mut PlayerController,
        Option<&ReadMassProperties>,
    )>,
) {
    for (mut ext_force, mut forces, mut controller, mass_props) in &mut q {
        let mass = mass_props
            .map(|props| props.mass)
            .filter(|mass| *mass > 0.0 && mass.is_finite())
            .unwrap_or(1.0);
        let force = controller.finalize_frame() * mass;
        ext_force.force += force;
        forces.applied = force;
    }
}

/// Bundle for creating a player with Rapier3D physics.
///
/// This bundle provides the Rapier3D components a player controller entity
/// needs: a dynamic rigid body with rotation locked (facing is written to the
/// transform directly), velocity tracking, external forces and impulses, and
/// mass properties.
///
/// # Example
///
/// ```ignore
/// use bevy::prelude::*;
/// use bevy_rapier3d::prelude::*;
/// use updraft_controller::prelude::*;
///
/// fn spawn_player(mut commands: Commands) {
///     commands.spawn((
///         Transform::from_xyz(0.0, 2.0, 0.0),
///         PlayerController::new(),
///         ControllerConfig::default(),
///         InputBindings::default(),
///         Rapier3dCharacterBundle::new(),
///         Collider::capsule_y(0.5, 0.4),
///     ));
/// }
/// ```
///
/// # Defaults
///
/// - `rigid_body`: [`RigidBody::Dynamic`]
/// - `locked_axes`: [`LockedAxes::ROTATION_LOCKED`]
/// - `damping`: none, horizontal easing comes from the controller's inertia
/// - `mass_properties`: computed by Rapier from the collider
#[derive(Bundle, Default)]
pub struct Rapier3dCharacterBundle {
    /// The rigid body type. Should typically be [`RigidBody::Dynamic`].
    pub rigid_body: RigidBody,
    /// Current linear and angular velocity. Written by the controller every tick.
    pub velocity: Velocity,
    /// Forces integrated this step. The controller flushes accelerations here.
    pub external_force: ExternalForce,
    /// Impulses applied this step. Used for jump launches and grapple release.
    pub external_impulse: ExternalImpulse,
    /// The controller's share of `external_force`.
    pub controller_forces: ControllerForces,
    /// Which axes are locked.
    pub locked_axes: LockedAxes,
    /// Damping coefficients for velocity reduction.
    pub damping: Damping,
    /// Computed mass properties. Rapier updates this based on the collider.
    pub mass_properties: ReadMassProperties,
}

impl Rapier3dCharacterBundle {
    /// Create a dynamic, rotation-locked player body.
    pub fn new() -> Self {
        Self {
            rigid_body: RigidBody::Dynamic,
            velocity: Velocity::default(),
            external_force: ExternalForce::default(),
            external_impulse: ExternalImpulse::default(),
            controller_forces: ControllerForces::default(),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            damping: Damping {
                linear_damping: 0.0,
                angular_damping: 0.0,
            },
            mass_properties: ReadMassProperties::default(),
        }
    }

    /// Set the rigid body type for the player.
    ///
    /// ```ignore
    /// // Scripted movement for a cutscene
    /// let bundle = Rapier3dCharacterBundle::new()
    ///     .with_body(RigidBody::KinematicVelocityBased);
    /// ```
    pub fn with_body(mut self, body: RigidBody) -> Self {
        self.rigid_body = body;
        self
    }

    /// Set the damping coefficients for velocity reduction.
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.damping = Damping {
            linear_damping: linear,
            angular_damping: angular,
        };
        self
    }

    /// Set which axes should be locked for the rigid body.
    pub fn with_locked_axes(mut self, axes: LockedAxes) -> Self {
        self.locked_axes = axes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn create_test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());
        app.insert_resource(Time::<Fixed>::from_hz(60.0));
        app
    }

    #[test]
    fn rapier_backend_get_position() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((Transform::from_xyz(1.0, 2.0, 3.0), RigidBody::Dynamic))
            .id();

        app.update();

        let pos = Rapier3dBackend::get_position(app.world(), entity);
        assert!((pos - Vec3::new(1.0, 2.0, 3.0)).length() < 0.01);
    }

    #[test]
    fn rapier_backend_velocity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                RigidBody::Dynamic,
                Velocity::linear(Vec3::new(5.0, 3.0, -2.0)),
            ))
            .id();

        app.update();

        assert!(Rapier3dBackend::has_body(app.world(), entity));
        let vel = Rapier3dBackend::get_velocity(app.world(), entity);
        assert!((vel.x - 5.0).abs() < 0.01);
        assert!((vel.z + 2.0).abs() < 0.01);

        Rapier3dBackend::set_velocity(app.world_mut(), entity, Vec3::new(10.0, 0.0, 0.0));

        let vel = Rapier3dBackend::get_velocity(app.world(), entity);
        assert!((vel.x - 10.0).abs() < 0.01);
        assert!(vel.y.abs() < 0.01);
    }

    #[test]
    fn entity_without_body_is_reported_missing() {
        let mut app = create_test_app();
        let entity = app.world_mut().spawn(Transform::default()).id();
        assert!(!Rapier3dBackend::has_body(app.world(), entity));
        assert_eq!(Rapier3dBackend::get_velocity(app.world(), entity), Vec3::ZERO);
    }

    #[test]
    fn controller_forces_round_trip_keeps_user_force() {
        let mut app = create_test_app();
        let entity = app
            .world_mut()
            .spawn((
                PlayerController::new(),
                ControllerForces::default(),
                ExternalForce {
                    force: Vec3::X,
                    torque: Vec3::ZERO,
                },
            ))
            .id();

        app.world_mut()
            .get_mut::<PlayerController>(entity)
            .expect("controller")
            .add_acceleration(Vec3::NEG_Y * 4.0);
        app.world_mut()
            .run_system_once(apply_controller_forces)
            .expect("flush");
        let force = app.world().get::<ExternalForce>(entity).expect("force").force;
        assert_eq!(force, Vec3::new(1.0, -4.0, 0.0));

        app.world_mut()
            .run_system_once(clear_controller_forces)
            .expect("clear");
        let force = app.world().get::<ExternalForce>(entity).expect("force").force;
        assert_eq!(force, Vec3::X);
    }

    #[test]
    fn rapier_character_bundle_creates_valid_entity() {
        let mut app = create_test_app();

        let entity = app
            .world_mut()
            .spawn((
                Transform::default(),
                Rapier3dCharacterBundle::new(),
                Collider::capsule_y(0.5, 0.4),
            ))
            .id();

        app.update();

        assert!(app.world().get::<RigidBody>(entity).is_some());
        assert!(app.world().get::<Velocity>(entity).is_some());
        assert!(app.world().get::<ExternalForce>(entity).is_some());
        assert_eq!(
            app.world().get::<LockedAxes>(entity).copied(),
            Some(LockedAxes::ROTATION_LOCKED)
        );
    }
}
