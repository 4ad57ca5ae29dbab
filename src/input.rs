//! Input sampling.
//!
//! Reads keyboard and mouse state once per rendered frame into
//! [`MovementIntent`], and resolves raw two-axis input into a world-space,
//! camera-relative move direction.

use bevy::prelude::*;

use crate::intent::{MovementIntent, MOVE_INPUT_THRESHOLD};

/// Marker for the camera whose orientation defines "forward" for movement
/// and the centre-screen ray for the grapple hook.
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct PlayerCamera;

/// Key and mouse bindings read by [`sample_keyboard_input`].
///
/// Entities without this component are not driven by the keyboard sampler;
/// feed their [`MovementIntent`] from your own input source instead.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct InputBindings {
    pub forward: Vec<KeyCode>,
    pub back: Vec<KeyCode>,
    pub left: Vec<KeyCode>,
    pub right: Vec<KeyCode>,
    pub jump: Vec<KeyCode>,
    pub high_energy_keys: Vec<KeyCode>,
    pub high_energy_buttons: Vec<MouseButton>,
    pub grapple_keys: Vec<KeyCode>,
    pub grapple_buttons: Vec<MouseButton>,
}

impl Default for InputBindings {
    fn default() -> Self {
        Self {
            forward: vec![KeyCode::KeyW, KeyCode::ArrowUp],
            back: vec![KeyCode::KeyS, KeyCode::ArrowDown],
            left: vec![KeyCode::KeyA, KeyCode::ArrowLeft],
            right: vec![KeyCode::KeyD, KeyCode::ArrowRight],
            jump: vec![KeyCode::Space],
            high_energy_keys: vec![KeyCode::AltLeft],
            high_energy_buttons: vec![MouseButton::Right],
            grapple_keys: vec![KeyCode::KeyE],
            grapple_buttons: vec![MouseButton::Left],
        }
    }
}

impl InputBindings {
    /// Read the two move axes from the keyboard.
    pub fn axes(&self, keys: &ButtonInput<KeyCode>) -> Vec2 {
        Vec2::new(
            get_axis(keys, &self.right, &self.left),
            get_axis(keys, &self.forward, &self.back),
        )
    }
}

fn any_pressed(keys: &ButtonInput<KeyCode>, codes: &[KeyCode]) -> bool {
    codes.iter().any(|code| keys.pressed(*code))
}

fn get_axis(keys: &ButtonInput<KeyCode>, positive: &[KeyCode], negative: &[KeyCode]) -> f32 {
    let mut value = 0.0;
    if any_pressed(keys, positive) {
        value += 1.0;
    }
    if any_pressed(keys, negative) {
        value -= 1.0;
    }
    value
}

/// Resolve raw two-axis input into a unit world-space direction (or zero).
///
/// With a camera, x follows the camera's right vector and y its forward
/// vector flattened onto the ground plane. Without one, x maps to world +X
/// and y to world -Z (Bevy's forward).
pub fn resolve_move_direction(axes: Vec2, camera: Option<&GlobalTransform>) -> Vec3 {
    if axes.length() <= MOVE_INPUT_THRESHOLD * 0.5 {
        return Vec3::ZERO;
    }

    let (right, forward) = match camera {
        Some(transform) => {
            let right = transform.right().as_vec3();
            let forward = transform.forward().as_vec3() * Vec3::new(1.0, 0.0, 1.0);
            (right, forward.normalize_or_zero())
        }
        None => (Vec3::X, Vec3::NEG_Z),
    };

    (right * axes.x + forward * axes.y).normalize_or_zero()
}

/// Sample keyboard and mouse into every bound [`MovementIntent`].
///
/// Runs in `Update`. Missing input resources (headless apps) leave intents
/// untouched.
pub fn sample_keyboard_input(
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    mut q_players: Query<(&InputBindings, &mut MovementIntent)>,
) {
    let Some(keys) = keys else {
        return;
    };

    for (bindings, mut intent) in &mut q_players {
        let mouse_pressed = |buttons: &[MouseButton]| {
            mouse
                .as_ref()
                .is_some_and(|m| buttons.iter().any(|b| m.pressed(*b)))
        };

        intent.set_move_axes(bindings.axes(&keys));
        intent.set_jump_pressed(any_pressed(&keys, &bindings.jump));
        intent.set_high_energy_pressed(
            any_pressed(&keys, &bindings.high_energy_keys)
                || mouse_pressed(&bindings.high_energy_buttons),
        );
        intent.set_grapple_pressed(
            any_pressed(&keys, &bindings.grapple_keys) || mouse_pressed(&bindings.grapple_buttons),
        );
    }
}
