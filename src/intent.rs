//! Movement intent components.
//!
//! Intents represent what the player (or an AI, or a replay) wants this tick.
//! The controller systems read these intents; they never read devices directly.
//! Button presses and releases are latched until a fixed tick consumes them, so
//! a tap that starts and ends between two physics steps still registers.

use bevy::prelude::*;

/// Dead zone under which a move axis or direction counts as no input.
pub const MOVE_INPUT_THRESHOLD: f32 = 0.1;

/// Unified input intent for the player controller.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::Vec2;
/// use updraft_controller::prelude::*;
///
/// let mut intent = MovementIntent::new();
/// intent.set_move_axes(Vec2::new(0.0, 1.0));
/// assert!(intent.has_move_input());
///
/// intent.set_jump_pressed(true);
/// assert!(intent.jump_just_pressed());
///
/// intent.clear();
/// assert!(!intent.has_move_input());
/// ```
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct MovementIntent {
    /// Raw two-axis move input (x = right, y = forward), each in [-1, 1].
    pub axes: Vec2,

    /// Whether the jump button is currently held.
    pub jump_held: bool,

    /// Whether the grapple button is currently held.
    pub grapple_held: bool,

    /// Whether the high-energy toggle button is currently held.
    pub high_energy_held: bool,

    /// When false every intent is ignored and cleared (external freeze).
    pub input_enabled: bool,

    /// Latched rising edge of the jump button, cleared when consumed.
    pub(crate) jump_press_latched: bool,

    /// Latched falling edge of the jump button, cleared when consumed.
    pub(crate) jump_release_latched: bool,

    /// Latched rising edge of the high-energy toggle.
    pub(crate) high_energy_toggle_latched: bool,

    /// Latched rising edge of the grapple button.
    pub(crate) grapple_latched: bool,
}

impl Default for MovementIntent {
    fn default() -> Self {
        Self {
            axes: Vec2::ZERO,
            jump_held: false,
            grapple_held: false,
            high_energy_held: false,
            input_enabled: true,
            jump_press_latched: false,
            jump_release_latched: false,
            high_energy_toggle_latched: false,
            grapple_latched: false,
        }
    }
}

impl MovementIntent {
    /// Create a new empty movement intent.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw move axes, clamped to [-1, 1] per axis.
    pub fn set_move_axes(&mut self, axes: Vec2) {
        if !self.input_enabled {
            return;
        }
        self.axes = axes.clamp(Vec2::NEG_ONE, Vec2::ONE);
    }

    /// Whether the move axes are outside the dead zone.
    pub fn has_move_input(&self) -> bool {
        self.axes.length() > MOVE_INPUT_THRESHOLD
    }

    /// Set the jump button state.
    ///
    /// Call this every frame with the current button level. Rising and
    /// falling edges are latched for the next fixed tick.
    pub fn set_jump_pressed(&mut self, pressed: bool) {
        if !self.input_enabled {
            return;
        }
        if pressed && !self.jump_held {
            self.jump_press_latched = true;
        } else if !pressed && self.jump_held {
            self.jump_release_latched = true;
        }
        self.jump_held = pressed;
    }

    /// Set the high-energy toggle button state (rising edge toggles).
    pub fn set_high_energy_pressed(&mut self, pressed: bool) {
        if !self.input_enabled {
            return;
        }
        if pressed && !self.high_energy_held {
            self.high_energy_toggle_latched = true;
        }
        self.high_energy_held = pressed;
    }

    /// Set the grapple button state (rising edge fires).
    pub fn set_grapple_pressed(&mut self, pressed: bool) {
        if !self.input_enabled {
            return;
        }
        if pressed && !self.grapple_held {
            self.grapple_latched = true;
        }
        self.grapple_held = pressed;
    }

    /// Whether a jump press is waiting to be consumed.
    pub fn jump_just_pressed(&self) -> bool {
        self.jump_press_latched
    }

    /// Whether a jump release is waiting to be consumed.
    pub fn jump_just_released(&self) -> bool {
        self.jump_release_latched
    }

    /// Whether a high-energy toggle is waiting to be consumed.
    pub fn high_energy_toggle_requested(&self) -> bool {
        self.high_energy_toggle_latched
    }

    /// Whether a grapple shot is waiting to be consumed.
    pub fn grapple_requested(&self) -> bool {
        self.grapple_latched
    }

    /// Take the pending high-energy toggle, if any.
    pub fn take_high_energy_toggle(&mut self) -> bool {
        std::mem::take(&mut self.high_energy_toggle_latched)
    }

    /// Take the pending grapple shot, if any.
    pub fn take_grapple_request(&mut self) -> bool {
        std::mem::take(&mut self.grapple_latched)
    }

    /// Clear every latched edge once the fixed tick has consumed them.
    pub(crate) fn consume_edges(&mut self) {
        self.jump_press_latched = false;
        self.jump_release_latched = false;
        self.high_energy_toggle_latched = false;
        self.grapple_latched = false;
    }

    /// Enable or disable input (used to freeze the player, e.g. on a win screen).
    ///
    /// Disabling clears all held state and pending edges.
    pub fn set_input_enabled(&mut self, enabled: bool) {
        self.input_enabled = enabled;
        if !enabled {
            self.clear();
        }
    }

    /// Clear all intents, held buttons and pending edges.
    pub fn clear(&mut self) {
        self.axes = Vec2::ZERO;
        self.jump_held = false;
        self.grapple_held = false;
        self.high_energy_held = false;
        self.jump_press_latched = false;
        self.jump_release_latched = false;
        self.high_energy_toggle_latched = false;
        self.grapple_latched = false;
    }
}
