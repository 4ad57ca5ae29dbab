//! Scripted physics backend for headless controller tests.
//!
//! Bodies integrate their own velocity once per fixed tick. Ground contact
//! and grapple hits are scripted per entity, so every scenario is exact and
//! independent of a physics engine.

#![allow(dead_code)]

use bevy::prelude::*;
use updraft_controller::backend::CharacterPhysicsBackend;
use updraft_controller::grapple::gun_tip;
use updraft_controller::prelude::*;

pub const DT: f32 = 1.0 / 60.0;

/// Minimal rigid body: a velocity integrated into the transform.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct TestBody {
    pub velocity: Vec3,
}

/// Scripted ground probe result.
#[derive(Component, Debug, Clone, Copy)]
pub struct ScriptedGround(pub bool);

/// Scripted grapple ray result.
#[derive(Component, Debug, Clone, Copy)]
pub struct ScriptedGrappleHit(pub Option<Vec3>);

pub struct TestBackend;

impl CharacterPhysicsBackend for TestBackend {
    fn plugin() -> impl Plugin {
        TestBackendPlugin
    }

    fn has_body(world: &World, entity: Entity) -> bool {
        world.get::<TestBody>(entity).is_some()
    }

    fn get_velocity(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<TestBody>(entity)
            .map(|b| b.velocity)
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocity(world: &mut World, entity: Entity, velocity: Vec3) {
        if let Some(mut body) = world.get_mut::<TestBody>(entity) {
            body.velocity = velocity;
        }
    }

    fn apply_impulse(world: &mut World, entity: Entity, impulse: Vec3) {
        if let Some(mut body) = world.get_mut::<TestBody>(entity) {
            body.velocity += impulse;
        }
    }

    fn apply_acceleration(world: &mut World, entity: Entity, acceleration: Vec3) {
        if let Some(mut controller) = world.get_mut::<PlayerController>(entity) {
            controller.add_acceleration(acceleration);
        }
    }

    fn get_position(world: &World, entity: Entity) -> Vec3 {
        world
            .get::<Transform>(entity)
            .map(|t| t.translation)
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
}

pub struct TestBackendPlugin;

impl Plugin for TestBackendPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                clear_accumulators.in_set(ControllerSet::Preparation),
                (scripted_ground, scripted_grapple)
                    .chain()
                    .in_set(ControllerSet::Sensors),
                integrate_bodies.in_set(ControllerSet::FinalApplication),
            ),
        );
    }
}

fn clear_accumulators(mut q: Query<&mut PlayerController>) {
    for mut controller in &mut q {
        controller.prepare_new_frame();
    }
}

fn scripted_ground(
    clock: Res<ControllerClock>,
    mut q: Query<(&ScriptedGround, &mut GroundState)>,
) {
    for (ground, mut state) in &mut q {
        state.record(ground.0, clock.elapsed());
    }
}

fn scripted_grapple(
    mut q: Query<(
        Entity,
        &Transform,
        &GrappleConfig,
        &ScriptedGrappleHit,
        &mut MovementIntent,
        &mut GrappleHook,
    )>,
    mut started: EventWriter<GrappleStarted>,
) {
    for (entity, transform, config, hit, mut intent, mut hook) in &mut q {
        if !intent.take_grapple_request() || hook.is_active() {
            continue;
        }
        let tip = gun_tip(transform.translation, transform.rotation, config);
        if let Some(anchor) = hook.try_fire(hit.0, tip) {
            started.write(GrappleStarted { entity, anchor });
        }
    }
}

/// Semi-implicit Euler with engine gravity off the ground.
fn integrate_bodies(
    mut q: Query<(
        &mut TestBody,
        &mut Transform,
        &mut PlayerController,
        Option<&ScriptedGround>,
    )>,
) {
    for (mut body, mut transform, mut controller, ground) in &mut q {
        let grounded = ground.is_some_and(|g| g.0);
        let mut acceleration = controller.finalize_frame();
        if !grounded {
            acceleration += controller.gravity;
        }
        body.velocity += acceleration * DT;
        if grounded && body.velocity.y < 0.0 {
            body.velocity.y = 0.0;
        }
        transform.translation += body.velocity * DT;
    }
}

/// Headless app with the controller on the scripted backend.
pub fn create_test_app() -> App {
    let mut app = App::new();

    app.add_plugins(MinimalPlugins);
    app.add_plugins(PlayerControllerPlugin::<TestBackend>::default());

    app.finish();
    app.cleanup();
    app
}

/// Spawn a grounded player at the origin.
pub fn spawn_player(app: &mut App, config: ControllerConfig) -> Entity {
    app.world_mut()
        .spawn((
            Transform::default(),
            PlayerController::new(),
            config,
            TestBody::default(),
            ScriptedGround(true),
        ))
        .id()
}

/// Run one fixed tick.
pub fn tick(app: &mut App) {
    app.world_mut().run_schedule(FixedUpdate);
}

/// Run `n` fixed ticks.
pub fn run_ticks(app: &mut App, n: usize) {
    for _ in 0..n {
        tick(app);
    }
}

pub fn intent_mut(app: &mut App, entity: Entity) -> Mut<'_, MovementIntent> {
    app.world_mut()
        .get_mut::<MovementIntent>(entity)
        .expect("player has a MovementIntent")
}

pub fn set_grounded(app: &mut App, entity: Entity, grounded: bool) {
    app.world_mut()
        .entity_mut(entity)
        .insert(ScriptedGround(grounded));
}

pub fn send_effect(app: &mut App, target: Entity, kind: EffectKind) {
    app.world_mut().send_event(PlayerEffect::new(target, kind));
}

pub fn velocity(app: &App, entity: Entity) -> Vec3 {
    app.world()
        .get::<TestBody>(entity)
        .expect("player has a TestBody")
        .velocity
}

pub fn set_velocity(app: &mut App, entity: Entity, velocity: Vec3) {
    app.world_mut()
        .get_mut::<TestBody>(entity)
        .expect("player has a TestBody")
        .velocity = velocity;
}

/// Controller acceleration accumulated on the last tick.
pub fn accumulated(app: &App, entity: Entity) -> Vec3 {
    app.world()
        .get::<PlayerController>(entity)
        .expect("player has a PlayerController")
        .accumulated_acceleration()
}

pub fn state(app: &App, entity: Entity) -> PlayerState {
    app.world()
        .get::<PlayerStateMachine>(entity)
        .expect("player has a state machine")
        .current()
}

/// Every event of type `E` sent so far.
pub fn events<E: Event + Clone>(app: &App) -> Vec<E> {
    let events = app.world().resource::<Events<E>>();
    events.get_cursor().read(events).cloned().collect()
}
