//! Core controller systems.
//!
//! These systems wire the per-module logic into the fixed tick. The ones
//! that write physics are exclusive and generic over the backend: they
//! collect what they need from the world first, then call the backend per
//! entity.

use bevy::prelude::*;

use crate::air::{air_acceleration, clamp_fall_speed, AirInput};
use crate::animation::{ClipLibrary, ClipPlayer, ClipRequested, SoundCue};
use crate::backend::CharacterPhysicsBackend;
use crate::config::{ControllerConfig, GrappleConfig, PlayerController, StateMachineConfig};
use crate::effects::{launch_velocity, EffectKind, MovementModifiers, PlayerEffect};
use crate::energy::{Energy, EnergyChange, HighEnergyChanged};
use crate::grapple::{GrappleEnd, GrappleEnded, GrappleHook};
use crate::inference::{AnimationInference, InferenceConfig, InferenceInput};
use crate::input::{resolve_move_direction, PlayerCamera};
use crate::intent::{MovementIntent, MOVE_INPUT_THRESHOLD};
use crate::jump::{ChargeJump, JumpGate, JumpLaunched};
use crate::locomotion::{facing_rotation, signed_yaw_degrees, step_horizontal, KineticState};
use crate::machine::{on_enter, on_exit, ExitAction, PlayerSnapshot, PlayerStateMachine, Turn};
use crate::sensor::{GroundSensor, GroundState};
use crate::ControllerClock;

fn clock(world: &World) -> ControllerClock {
    world
        .get_resource::<ControllerClock>()
        .copied()
        .unwrap_or_default()
}

/// Advance the controller clock by one fixed step.
pub fn advance_controller_clock<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = B::get_fixed_timestep(world);
    if let Some(mut clock) = world.get_resource_mut::<ControllerClock>() {
        clock.tick(dt);
    }
}

/// One-time setup of newly spawned controllers.
///
/// Sanitizes the config, fills a default energy tank and synthesizes a default
/// [`GroundSensor`] when the entity was spawned without one.
pub fn initialize_controllers(
    mut commands: Commands,
    mut q_controllers: Query<(
        Entity,
        &mut PlayerController,
        &mut ControllerConfig,
        &mut ChargeJump,
        &mut Energy,
        Has<GroundSensor>,
    )>,
) {
    for (entity, mut controller, mut config, mut charge, mut energy, has_sensor) in
        &mut q_controllers
    {
        if controller.initialized {
            continue;
        }
        controller.initialized = true;

        *config = config.sanitized();
        *charge = ChargeJump::from_config(&config);
        // A tank spawned by the game (a restored checkpoint) is kept as is
        if *energy == Energy::default() {
            *energy = Energy::full(config.max_energy);
        }

        if !has_sensor {
            debug!("{entity}: no ground sensor, using the default foot probe");
            commands.entity(entity).insert(GroundSensor::default());
        }
        debug!("{entity}: player controller initialized");
    }
}

/// Warn once per entity when a controller has no physics body.
pub fn report_missing_bodies<B: CharacterPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, bool)> = world
        .query::<(Entity, &PlayerController)>()
        .iter(world)
        .map(|(e, controller)| (e, controller.missing_body_reported))
        .collect();

    for (entity, reported) in entities {
        let has_body = B::has_body(world, entity);
        if has_body == !reported {
            continue;
        }
        if !has_body {
            warn!("{entity}: player controller has no physics body, skipping physics writes");
        }
        if let Some(mut controller) = world.get_mut::<PlayerController>(entity) {
            controller.missing_body_reported = !has_body;
        }
    }
}

/// Sync the [`Grounded`](crate::state::Grounded) and
/// [`Airborne`](crate::state::Airborne) markers from this tick's ground state.
pub fn sync_state_markers(
    mut commands: Commands,
    q_controllers: Query<(
        Entity,
        &GroundState,
        Has<crate::state::Grounded>,
        Has<crate::state::Airborne>,
    )>,
) {
    use crate::state::{Airborne, Grounded};

    for (entity, ground, has_grounded, has_airborne) in &q_controllers {
        if ground.is_grounded && !has_grounded {
            commands.entity(entity).insert(Grounded).remove::<Airborne>();
        } else if !ground.is_grounded && !has_airborne {
            commands.entity(entity).insert(Airborne).remove::<Grounded>();
        }
    }
}

fn is_grappling(world: &World, entity: Entity) -> bool {
    world
        .get::<GrappleHook>(entity)
        .is_some_and(GrappleHook::is_active)
}

/// Apply queued [`PlayerEffect`]s and expire lingering slow zones.
pub fn apply_player_effects<B: CharacterPhysicsBackend>(world: &mut World) {
    let now = clock(world).elapsed();

    for mut modifiers in world.query::<&mut MovementModifiers>().iter_mut(world) {
        modifiers.tick(now);
    }

    let effects: Vec<PlayerEffect> = match world.get_resource_mut::<Events<PlayerEffect>>() {
        Some(mut events) => events.drain().collect(),
        None => return,
    };

    for PlayerEffect { target, kind } in effects {
        if world.get_entity(target).is_err() {
            debug!("{target}: effect {kind:?} dropped, entity is gone");
            continue;
        }

        match kind {
            EffectKind::AddEnergy(amount) => {
                if let Some(mut energy) = world.get_mut::<Energy>(target) {
                    energy.add(amount);
                }
            }
            EffectKind::Launch {
                force,
                bounce_multiplier,
                preserve_horizontal,
            } => {
                if is_grappling(world, target) || !B::has_body(world, target) {
                    debug!("{target}: launch ignored");
                    continue;
                }
                let velocity = B::get_velocity(world, target);
                let launched = launch_velocity(velocity, force, bounce_multiplier, preserve_horizontal);
                B::set_velocity(world, target, launched);
                debug!("{target}: launched to {launched}");
            }
            EffectKind::Wind(acceleration) => {
                if !is_grappling(world, target) && B::has_body(world, target) {
                    B::apply_acceleration(world, target, acceleration);
                }
            }
            EffectKind::EnterSlowZone {
                source,
                multiplier,
                forbid_jump,
                linger,
            } => {
                if let Some(mut modifiers) = world.get_mut::<MovementModifiers>(target) {
                    modifiers.enter(source, multiplier, forbid_jump, linger);
                }
            }
            EffectKind::ExitSlowZone { source } => {
                if let Some(mut modifiers) = world.get_mut::<MovementModifiers>(target) {
                    modifiers.exit(source, now);
                }
            }
            EffectKind::SetInputEnabled(enabled) => {
                if let Some(mut intent) = world.get_mut::<MovementIntent>(target) {
                    intent.set_input_enabled(enabled);
                    info!("{target}: input {}", if enabled { "enabled" } else { "disabled" });
                }
            }
        }
    }
}

/// Resolve move axes into a world-space direction relative to the camera.
pub fn resolve_move_directions(
    q_camera: Query<&GlobalTransform, With<PlayerCamera>>,
    mut q_players: Query<(&MovementIntent, &mut KineticState)>,
) {
    let camera = q_camera.single().ok();
    for (intent, mut kinetic) in &mut q_players {
        kinetic.move_direction = resolve_move_direction(intent.axes, camera);
    }
}

/// Toggle high-energy mode on request and drain or recharge the tank.
pub fn update_energy(
    clock: Res<ControllerClock>,
    mut q_players: Query<(Entity, &ControllerConfig, &mut MovementIntent, &mut Energy)>,
    mut changes: EventWriter<HighEnergyChanged>,
) {
    for (entity, config, mut intent, mut energy) in &mut q_players {
        let mut report = |change: EnergyChange, energy: &Energy| {
            changes.write(HighEnergyChanged {
                entity,
                enabled: energy.high_energy,
                change,
                energy: energy.current,
            });
        };

        if intent.take_high_energy_toggle() {
            match energy.toggle(config.min_energy_threshold) {
                Some(change) => {
                    debug!("{entity}: high energy {change:?} at {:.1}", energy.current);
                    report(change, &energy);
                }
                None => debug!(
                    "{entity}: high energy refused, {:.1} energy at threshold {:.1}",
                    energy.current, config.min_energy_threshold
                ),
            }
        }

        if let Some(change) = energy.tick(clock.delta(), config) {
            info!("{entity}: energy depleted, high energy off");
            report(change, &energy);
        }
    }
}

/// Charge, hold and release the jump.
///
/// A launch zeroes the vertical velocity first so every jump of the same
/// charge reaches the same height regardless of what the body was doing.
pub fn apply_charge_jump<B: CharacterPhysicsBackend>(world: &mut World) {
    let clock = clock(world);
    let (now, dt) = (clock.elapsed(), clock.delta());

    let entities: Vec<(Entity, ControllerConfig, MovementIntent, GroundState, bool, bool)> = world
        .query::<(
            Entity,
            &ControllerConfig,
            &MovementIntent,
            &GroundState,
            Option<&JumpGate>,
            Option<&MovementModifiers>,
            Option<&Energy>,
        )>()
        .iter(world)
        .map(|(e, config, intent, ground, gate, modifiers, energy)| {
            let gate_open = gate.is_none_or(|g| g.enabled) && !modifiers.is_some_and(|m| m.jump_blocked());
            let high_energy = energy.is_some_and(|e| e.high_energy);
            (e, *config, intent.clone(), *ground, gate_open, high_energy)
        })
        .collect();

    for (entity, config, intent, ground, gate_open, high_energy) in entities {
        if !B::has_body(world, entity) {
            continue;
        }
        let grappling = is_grappling(world, entity);
        let Some(mut charge) = world.get_mut::<ChargeJump>(entity) else {
            continue;
        };

        if ground.is_grounded {
            charge.land(now);
        }
        if grappling || !intent.input_enabled || !gate_open {
            if charge.is_charging() {
                charge.reset(&config);
                debug!("{entity}: charge dropped");
            }
            if !gate_open && intent.jump_just_pressed() {
                debug!("{entity}: jump refused, gate closed");
            }
            continue;
        }

        let allowed = charge.allows_jump(gate_open, &ground, now, config.coyote_time);

        let mut launch = None;
        if intent.jump_just_pressed() {
            launch = charge.press(allowed, &config, now);
        }
        if intent.jump_held {
            charge.hold(dt, &config);
        }
        if launch.is_none() && intent.jump_just_released() {
            launch = charge.release(allowed, &config, now);
            if launch.is_none() && charge.is_charging() {
                debug!("{entity}: released in the air, charge kept for landing");
            }
        }
        if launch.is_none() {
            launch = charge.poll_landing(allowed, &config, now);
        }

        let Some(force) = launch else {
            continue;
        };
        let force = if high_energy {
            force * config.high_energy_jump_multiplier
        } else {
            force
        };

        let mut velocity = B::get_velocity(world, entity);
        velocity.y = 0.0;
        B::set_velocity(world, entity, velocity);
        B::apply_impulse(world, entity, Vec3::Y * force);

        let coyote = !ground.is_grounded;
        debug!("{entity}: jump launched with {force:.2}{}", if coyote { " (coyote)" } else { "" });
        world.send_event(JumpLaunched {
            entity,
            force,
            coyote,
        });
    }
}

/// Drive horizontal velocity toward the move direction and turn to face it.
pub fn apply_locomotion<B: CharacterPhysicsBackend>(world: &mut World) {
    let dt = clock(world).delta();

    let entities: Vec<(Entity, ControllerConfig, Vec3, f32, bool)> = world
        .query::<(
            Entity,
            &ControllerConfig,
            &KineticState,
            Option<&Energy>,
            Option<&MovementModifiers>,
        )>()
        .iter(world)
        .map(|(e, config, kinetic, energy, modifiers)| {
            let high_energy = energy.is_some_and(|e| e.high_energy);
            let multiplier = modifiers.map_or(1.0, MovementModifiers::speed_multiplier);
            (
                e,
                *config,
                kinetic.move_direction,
                config.effective_move_speed(high_energy) * multiplier,
                high_energy,
            )
        })
        .collect();

    for (entity, config, direction, speed, high_energy) in entities {
        if !B::has_body(world, entity) || is_grappling(world, entity) {
            continue;
        }

        let velocity = B::get_velocity(world, entity);
        let horizontal = Vec3::new(velocity.x, 0.0, velocity.z);
        let next = step_horizontal(horizontal, direction, speed, &config, dt);
        B::set_velocity(world, entity, Vec3::new(next.x, velocity.y, next.z));

        if direction != Vec3::ZERO {
            let rotation = B::get_rotation(world, entity);
            let rate = config.effective_rotation_speed(high_energy);
            let facing = facing_rotation(rotation, direction, config.model_forward_offset, rate, dt);
            B::set_rotation(world, entity, facing);
        }

        if let Some(mut kinetic) = world.get_mut::<KineticState>(entity) {
            kinetic.horizontal_velocity = next;
        }
    }
}

/// Extra gravity while airborne, then clamp the fall speed.
pub fn apply_air_physics<B: CharacterPhysicsBackend>(world: &mut World) {
    let now = clock(world).elapsed();

    let entities: Vec<(Entity, ControllerConfig, f32, bool, bool, Option<f32>)> = world
        .query::<(
            Entity,
            &ControllerConfig,
            &PlayerController,
            &GroundState,
            &MovementIntent,
            &ChargeJump,
        )>()
        .iter(world)
        .map(|(e, config, controller, ground, intent, charge)| {
            (
                e,
                *config,
                controller.gravity.y,
                ground.is_grounded,
                intent.jump_held,
                charge.launch_time(),
            )
        })
        .collect();

    for (entity, config, gravity_y, grounded, jump_held, launch_time) in entities {
        if grounded || !B::has_body(world, entity) || is_grappling(world, entity) {
            continue;
        }

        let velocity = B::get_velocity(world, entity);
        let input = AirInput {
            vertical_velocity: velocity.y,
            gravity_y,
            jump_held,
            time_since_launch: launch_time.map(|t| now - t),
        };
        let acceleration = air_acceleration(input, &config);
        if acceleration != 0.0 {
            B::apply_acceleration(world, entity, Vec3::Y * acceleration);
        }

        if let Some(vy) = clamp_fall_speed(velocity.y, &config) {
            B::set_velocity(world, entity, Vec3::new(velocity.x, vy, velocity.z));
        }
    }
}

/// Pull anchored players toward their anchor.
///
/// The pull owns the whole velocity. A jump press lets go with a small
/// upward impulse; reaching the anchor stops the body dead.
pub fn apply_grapple_pull<B: CharacterPhysicsBackend>(world: &mut World) {
    let entities: Vec<(Entity, GrappleConfig, bool)> = world
        .query::<(Entity, &GrappleConfig, &GrappleHook, Option<&MovementIntent>)>()
        .iter(world)
        .filter(|(_, _, hook, _)| hook.is_active())
        .map(|(e, config, _, intent)| (e, *config, intent.is_some_and(MovementIntent::jump_just_pressed)))
        .collect();

    for (entity, config, release) in entities {
        if !B::has_body(world, entity) {
            continue;
        }

        let position = B::get_position(world, entity);
        let end = if release {
            B::apply_impulse(world, entity, Vec3::Y * config.release_impulse);
            Some(GrappleEnd::Released)
        } else if world
            .get::<GrappleHook>(entity)
            .is_some_and(|hook| hook.has_reached_target(position, config.reach_threshold))
        {
            B::set_velocity(world, entity, Vec3::ZERO);
            Some(GrappleEnd::Reached)
        } else {
            None
        };

        let Some(mut hook) = world.get_mut::<GrappleHook>(entity) else {
            continue;
        };
        match end {
            Some(end) => {
                hook.finish(end);
                debug!("{entity}: grapple {end:?}");
                world.send_event(GrappleEnded { entity, end });
            }
            None => {
                if let Some(pull) = hook.pull_velocity(position, config.pull_speed) {
                    B::set_velocity(world, entity, pull);
                }
            }
        }
    }
}

/// Record the body velocity for accessors and the animation layer.
pub fn sample_velocity<B: CharacterPhysicsBackend>(world: &mut World) {
    let entities: Vec<Entity> = world
        .query_filtered::<Entity, With<KineticState>>()
        .iter(world)
        .collect();

    for entity in entities {
        if !B::has_body(world, entity) {
            continue;
        }
        let velocity = B::get_velocity(world, entity);
        if let Some(mut kinetic) = world.get_mut::<KineticState>(entity) {
            kinetic.velocity = velocity;
        }
    }
}

fn turn_between(from: Vec3, to: Vec3, threshold: f32) -> Option<Turn> {
    if from == Vec3::ZERO || to == Vec3::ZERO {
        return None;
    }
    let angle = signed_yaw_degrees(from, to);
    if angle > threshold {
        Some(Turn::Left)
    } else if angle < -threshold {
        Some(Turn::Right)
    } else {
        None
    }
}

/// Step the predicate state machine and play the entered state's clip.
#[allow(clippy::type_complexity)]
pub fn update_state_machine(
    clock: Res<ControllerClock>,
    library: Res<ClipLibrary>,
    mut q_players: Query<
        (
            Entity,
            &mut PlayerStateMachine,
            &mut ClipPlayer,
            Option<&mut GrappleHook>,
            Option<&StateMachineConfig>,
            &ControllerConfig,
            &MovementIntent,
            &GroundState,
            &ChargeJump,
            &KineticState,
            Option<&JumpGate>,
            Option<&MovementModifiers>,
        ),
        Without<AnimationInference>,
    >,
    mut clips: EventWriter<ClipRequested>,
    mut sounds: EventWriter<SoundCue>,
) {
    let default_config = StateMachineConfig::default();

    for (
        entity,
        mut machine,
        mut player,
        mut hook,
        machine_config,
        config,
        intent,
        ground,
        charge,
        kinetic,
        gate,
        modifiers,
    ) in &mut q_players
    {
        let machine_config = machine_config.unwrap_or(&default_config);

        if !machine.entered {
            machine.entered = true;
            let enter = on_enter(&machine.state);
            player.play(enter.clip, machine_config.clip_transition_time, machine_config.clip_layer);
        }

        let gate_open = gate.is_none_or(|g| g.enabled) && !modifiers.is_some_and(|m| m.jump_blocked());
        let moving = kinetic.move_direction.length() > MOVE_INPUT_THRESHOLD;
        let turn = if moving {
            turn_between(
                machine.last_heading,
                kinetic.move_direction,
                machine_config.turn_angle_threshold,
            )
        } else {
            None
        };
        if moving {
            machine.last_heading = kinetic.move_direction;
        }

        let snapshot = PlayerSnapshot {
            moving,
            jump_pressed: intent.jump_just_pressed(),
            jump_released: intent.jump_just_released(),
            grounded: ground.is_grounded,
            can_jump: charge.allows_jump(gate_open, ground, clock.elapsed(), config.coyote_time),
            charging: charge.is_charging(),
            launched: charge.just_launched(),
            grapple_started: hook.as_ref().is_some_and(|h| h.just_started()),
            grapple_ended: hook.as_ref().is_some_and(|h| h.just_ended().is_some()),
            clip_finished: player.is_complete(on_enter(&machine.state).clip, &library),
            turn,
        };

        machine.observe(&snapshot, clock.delta());
        let Some((from, to)) = machine.step(&snapshot, machine_config) else {
            continue;
        };
        debug!("{entity}: {} -> {}", from.name(), to.name());

        if on_exit(&from) == ExitAction::StopGrappleVisual {
            if let Some(hook) = hook.as_mut() {
                hook.visual_enabled = false;
            }
        }

        let enter = on_enter(&to);
        player.play(enter.clip, machine_config.clip_transition_time, machine_config.clip_layer);
        clips.write(ClipRequested {
            entity,
            clip: enter.clip.to_string(),
            transition_time: machine_config.clip_transition_time,
            layer: machine_config.clip_layer,
        });
        if let Some(cue) = enter.sound {
            sounds.write(SoundCue { entity, cue });
        }
    }
}

/// Step the continuous inference variant for characters that opted in.
pub fn update_animation_inference(
    clock: Res<ControllerClock>,
    library: Res<ClipLibrary>,
    mut q_players: Query<(
        Entity,
        &mut AnimationInference,
        Option<&InferenceConfig>,
        &mut ClipPlayer,
        &KineticState,
        &GroundState,
        &ChargeJump,
    )>,
    mut clips: EventWriter<ClipRequested>,
) {
    let default_config = InferenceConfig::default();

    for (entity, mut inference, config, mut player, kinetic, ground, charge) in &mut q_players {
        let config = config.unwrap_or(&default_config);

        let input = InferenceInput {
            now: clock.elapsed(),
            dt: clock.delta(),
            move_direction: kinetic.move_direction,
            velocity: kinetic.velocity,
            grounded: ground.is_grounded,
            charging: charge.is_charging(),
            landing_progress: player
                .is_playing(&config.landing_clip)
                .then(|| player.normalized_time(&library)),
        };
        let output = inference.step(&input, config);

        let mut play = |player: &mut ClipPlayer, clip: &str, transition_time: f32| {
            player.play(clip, transition_time, 0);
            clips.write(ClipRequested {
                entity,
                clip: clip.to_string(),
                transition_time,
                layer: 0,
            });
        };

        if let Some((from, to)) = output.change {
            debug!("{entity}: {from:?} -> {to:?}");
            let (clip, transition_time) = to.clip();
            play(&mut player, clip, transition_time);
        }
        if output.play_landing {
            play(&mut player, &config.landing_clip, config.landing_transition);
        }
    }
}

/// Clear every edge consumed this tick.
pub fn consume_intent_edges(
    mut q_intents: Query<&mut MovementIntent>,
    mut q_charges: Query<&mut ChargeJump>,
    mut q_hooks: Query<&mut GrappleHook>,
) {
    for mut intent in &mut q_intents {
        intent.consume_edges();
    }
    for mut charge in &mut q_charges {
        charge.launched = false;
    }
    for mut hook in &mut q_hooks {
        hook.clear_edges();
    }
}
