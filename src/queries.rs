//! Read and write access to a player's gameplay state for game code.
//!
//! ```rust
//! use bevy::prelude::*;
//! use updraft_controller::prelude::*;
//!
//! fn hud(mut q_players: Query<PlayerQuery>) {
//!     for player in &mut q_players {
//!         let _ = (player.energy_percentage(), player.charge_progress());
//!     }
//! }
//! ```

use bevy::ecs::query::QueryData;
use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::energy::Energy;
use crate::intent::MovementIntent;
use crate::jump::ChargeJump;
use crate::locomotion::KineticState;
use crate::sensor::GroundState;

/// Player components exposed to game code.
#[derive(QueryData)]
#[query_data(mutable)]
pub struct PlayerQuery {
    pub entity: Entity,
    pub config: &'static ControllerConfig,
    pub kinetic: &'static KineticState,
    pub ground: &'static GroundState,
    pub charge: &'static ChargeJump,
    pub energy: &'static mut Energy,
    pub intent: &'static mut MovementIntent,
}

impl PlayerQueryItem<'_> {
    /// World-space move direction resolved this tick.
    pub fn move_direction(&self) -> Vec3 {
        self.kinetic.move_direction
    }

    /// Body velocity sampled at the end of the last tick.
    pub fn current_velocity(&self) -> Vec3 {
        self.kinetic.velocity
    }

    pub fn is_grounded(&self) -> bool {
        self.ground.is_grounded
    }

    pub fn is_charging(&self) -> bool {
        self.charge.is_charging()
    }

    /// Charge fraction in `[0, 1]`.
    pub fn charge_progress(&self) -> f32 {
        self.charge.progress(self.config)
    }

    /// Force a release right now would launch with, before multipliers.
    pub fn current_jump_force(&self) -> f32 {
        self.charge.jump_force
    }

    pub fn current_energy(&self) -> f32 {
        self.energy.current
    }

    pub fn max_energy(&self) -> f32 {
        self.energy.max
    }

    pub fn energy_percentage(&self) -> f32 {
        self.energy.percentage()
    }

    pub fn is_high_energy_mode(&self) -> bool {
        self.energy.high_energy
    }

    /// Add (or drain) energy, clamped to the tank.
    pub fn add_energy(&mut self, amount: f32) {
        self.energy.add(amount);
    }

    /// Enable or freeze player input.
    pub fn set_input_enabled(&mut self, enabled: bool) {
        self.intent.set_input_enabled(enabled);
    }
}
