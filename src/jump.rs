//! Charge jump.
//!
//! Holding the jump button charges a jump whose force interpolates linearly
//! from `min_jump_force` to `max_jump_force` over `max_charge_time`. The
//! charge never fires on its own while held; it fires on release when a jump
//! is allowed, or on the first tick a jump becomes allowed again when it was
//! started or released in the air. A closed jump gate refuses the jump
//! outright; nothing is kept for later.

use bevy::prelude::*;

use crate::config::ControllerConfig;
use crate::sensor::GroundState;

/// Phase of the charge jump.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargePhase {
    /// No charge in progress.
    #[default]
    Idle,
    /// Charging with a jump available.
    Charging,
    /// Charging in the air; fires as soon as a jump is available.
    PreCharging,
    /// Released while no jump was available; fires as soon as one is.
    AwaitingGround,
}

/// Per-entity charge state.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct ChargeJump {
    /// Current phase.
    pub phase: ChargePhase,

    /// Seconds charged, clamped to `[0, max_charge_time]`.
    pub charge_time: f32,

    /// Force the charge would release right now.
    pub jump_force: f32,

    /// Clock time of the last launch, cleared on landing.
    pub(crate) launch_time: Option<f32>,

    /// Set on the tick a charge fires.
    pub(crate) launched: bool,
}

impl Default for ChargeJump {
    fn default() -> Self {
        Self {
            phase: ChargePhase::Idle,
            charge_time: 0.0,
            jump_force: ControllerConfig::default().min_jump_force,
            launch_time: None,
            launched: false,
        }
    }
}

impl ChargeJump {
    /// Charge state resting at the config's minimum force.
    pub fn from_config(config: &ControllerConfig) -> Self {
        Self {
            jump_force: config.min_jump_force,
            ..default()
        }
    }

    /// Whether a charge (of any phase) is in progress.
    pub fn is_charging(&self) -> bool {
        self.phase != ChargePhase::Idle
    }

    /// Charge fraction in `[0, 1]`.
    pub fn progress(&self, config: &ControllerConfig) -> f32 {
        if config.max_charge_time <= 0.0 {
            return 1.0;
        }
        (self.charge_time / config.max_charge_time).clamp(0.0, 1.0)
    }

    /// Whether the last launch is still in its ascent window (not landed yet).
    pub fn launched_since_grounded(&self) -> bool {
        self.launch_time.is_some()
    }

    /// Whether a charge fired this tick.
    pub fn just_launched(&self) -> bool {
        self.launched
    }

    /// Clock time of the last launch, if the character has not landed since.
    pub fn launch_time(&self) -> Option<f32> {
        self.launch_time
    }

    /// [`can_jump`] for this character right now.
    ///
    /// Coyote time only follows walking off a ledge: after a launch the
    /// character must touch the ground again.
    pub fn allows_jump(
        &self,
        gate_open: bool,
        ground: &GroundState,
        now: f32,
        coyote_time: f32,
    ) -> bool {
        let last_grounded = if self.launched_since_grounded() {
            f32::NEG_INFINITY
        } else {
            ground.last_grounded_time
        };
        can_jump(gate_open, ground.is_grounded, now, last_grounded, coyote_time)
    }

    /// Jump button pressed.
    ///
    /// Returns the force to launch with when a pending charge fires right away.
    pub fn press(&mut self, can_jump: bool, config: &ControllerConfig, now: f32) -> Option<f32> {
        match self.phase {
            ChargePhase::Idle => {
                self.phase = if can_jump {
                    ChargePhase::Charging
                } else {
                    ChargePhase::PreCharging
                };
                self.charge_time = 0.0;
                self.jump_force = config.min_jump_force;
                None
            }
            _ if can_jump => Some(self.fire(config, now)),
            _ => None,
        }
    }

    /// Jump button held for `dt` seconds.
    pub fn hold(&mut self, dt: f32, config: &ControllerConfig) {
        if !matches!(self.phase, ChargePhase::Charging | ChargePhase::PreCharging) {
            return;
        }
        self.charge_time += dt;
        if self.charge_time >= config.max_charge_time {
            self.charge_time = config.max_charge_time;
            self.jump_force = config.max_jump_force;
        } else {
            self.jump_force = charge_force(self.charge_time, config);
        }
    }

    /// Jump button released.
    ///
    /// Fires when a jump is allowed. Otherwise the charge is kept and waits
    /// for the ground.
    pub fn release(&mut self, can_jump: bool, config: &ControllerConfig, now: f32) -> Option<f32> {
        if !self.is_charging() {
            return None;
        }
        if can_jump {
            Some(self.fire(config, now))
        } else {
            self.phase = ChargePhase::AwaitingGround;
            None
        }
    }

    /// Fire a charge started or released in the air once a jump is allowed.
    pub fn poll_landing(&mut self, can_jump: bool, config: &ControllerConfig, now: f32) -> Option<f32> {
        match self.phase {
            ChargePhase::PreCharging | ChargePhase::AwaitingGround if can_jump => {
                Some(self.fire(config, now))
            }
            _ => None,
        }
    }

    /// Drop any charge in progress.
    pub fn reset(&mut self, config: &ControllerConfig) {
        self.phase = ChargePhase::Idle;
        self.charge_time = 0.0;
        self.jump_force = config.min_jump_force;
    }

    /// Grounded at clock time `now`: clear the bookkeeping of any earlier launch.
    pub(crate) fn land(&mut self, now: f32) {
        if self.launch_time.is_some_and(|launched| now > launched) {
            self.launch_time = None;
        }
    }

    fn fire(&mut self, config: &ControllerConfig, now: f32) -> f32 {
        let force = self.jump_force;
        self.reset(config);
        self.launch_time = Some(now);
        self.launched = true;
        force
    }
}

/// Force for a charge of `charge_time` seconds.
pub fn charge_force(charge_time: f32, config: &ControllerConfig) -> f32 {
    let t = if config.max_charge_time > 0.0 {
        (charge_time / config.max_charge_time).clamp(0.0, 1.0)
    } else {
        1.0
    };
    config.min_jump_force + (config.max_jump_force - config.min_jump_force) * t
}

/// Whether a jump is allowed: gate open and grounded or within coyote time.
pub fn can_jump(gate_open: bool, grounded: bool, now: f32, last_grounded_time: f32, coyote_time: f32) -> bool {
    if !gate_open {
        return false;
    }
    grounded || now - last_grounded_time <= coyote_time
}

/// Manual jump gate. Hazards and game logic close it to forbid jumping.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct JumpGate {
    pub enabled: bool,
}

impl Default for JumpGate {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Sent every time a charge jump launches.
#[derive(Event, Debug, Clone, Copy)]
pub struct JumpLaunched {
    pub entity: Entity,
    /// Launch velocity applied, multipliers included.
    pub force: f32,
    /// Whether the jump used coyote time.
    pub coyote: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 60.0;

    fn config() -> ControllerConfig {
        ControllerConfig::default()
    }

    #[test]
    fn force_follows_lerp_and_is_monotonic() {
        let config = config();
        let mut jump = ChargeJump::from_config(&config);
        jump.press(true, &config, 0.0);

        let mut previous = jump.jump_force;
        for _ in 0..120 {
            jump.hold(DT, &config);
            let expected = charge_force(jump.charge_time, &config);
            assert!((jump.jump_force - expected).abs() < 1e-4);
            assert!(jump.jump_force >= previous);
            previous = jump.jump_force;
        }
    }

    #[test]
    fn release_at_zero_gives_min_force() {
        let config = config();
        let mut jump = ChargeJump::from_config(&config);
        assert!(jump.press(true, &config, 0.0).is_none());
        assert_eq!(jump.release(true, &config, 0.0), Some(config.min_jump_force));
        assert_eq!(jump.phase, ChargePhase::Idle);
    }

    #[test]
    fn holding_past_max_pins_force_without_firing() {
        let config = config();
        let mut jump = ChargeJump::from_config(&config);
        jump.press(true, &config, 0.0);
        for _ in 0..300 {
            jump.hold(DT, &config);
        }
        assert!(jump.is_charging());
        assert_eq!(jump.charge_time, config.max_charge_time);
        assert_eq!(jump.jump_force, config.max_jump_force);
        assert_eq!(jump.progress(&config), 1.0);
        assert_eq!(jump.release(true, &config, 5.0), Some(config.max_jump_force));
        assert_eq!(jump.launch_time(), Some(5.0));
        assert!(jump.just_launched());
    }

    #[test]
    fn press_in_air_pre_charges_and_fires_on_landing() {
        let config = config();
        let mut jump = ChargeJump::from_config(&config);
        jump.press(false, &config, 0.0);
        assert_eq!(jump.phase, ChargePhase::PreCharging);

        for _ in 0..18 {
            jump.hold(DT, &config);
            assert!(jump.poll_landing(false, &config, 0.0).is_none());
        }
        let force = jump.poll_landing(true, &config, 0.3).expect("fires on landing");
        assert!(force > config.min_jump_force);
        assert!(!jump.is_charging());
    }

    #[test]
    fn release_in_air_keeps_charge() {
        let config = config();
        let mut jump = ChargeJump::from_config(&config);
        jump.press(true, &config, 0.0);
        for _ in 0..30 {
            jump.hold(DT, &config);
        }
        let charged = jump.jump_force;

        assert!(jump.release(false, &config, 1.0).is_none());
        assert_eq!(jump.phase, ChargePhase::AwaitingGround);
        assert_eq!(jump.jump_force, charged);

        // Holding does nothing once released
        jump.hold(DT, &config);
        assert_eq!(jump.jump_force, charged);

        // Pressing again once a jump is allowed fires the stored charge
        assert_eq!(jump.press(true, &config, 2.0), Some(charged));
    }

    #[test]
    fn press_while_pre_charging_without_ground_does_nothing() {
        let config = config();
        let mut jump = ChargeJump::from_config(&config);
        jump.press(false, &config, 0.0);
        assert!(jump.press(false, &config, 0.1).is_none());
        assert_eq!(jump.phase, ChargePhase::PreCharging);
    }

    #[test]
    fn can_jump_window() {
        let coyote = 0.15;
        assert!(can_jump(true, true, 10.0, 10.0, coyote));
        assert!(can_jump(true, false, 0.15, 0.0, coyote));
        assert!(!can_jump(true, false, 0.151, 0.0, coyote));
        assert!(!can_jump(false, true, 10.0, 10.0, coyote));
    }

    #[test]
    fn grounded_tick_after_launch_clears_launch_time() {
        let config = config();
        let mut jump = ChargeJump::from_config(&config);
        jump.press(true, &config, 0.0);
        jump.release(true, &config, 0.5);
        assert!(jump.launched_since_grounded());

        // Same tick as the launch
        jump.land(0.5);
        assert!(jump.launched_since_grounded());

        jump.land(0.5 + DT);
        assert!(!jump.launched_since_grounded());
    }

    #[test]
    fn no_coyote_window_after_a_launch() {
        let config = config();
        let ground = GroundState {
            last_grounded_time: 1.0,
            ..default()
        };
        let mut jump = ChargeJump::from_config(&config);
        assert!(jump.allows_jump(true, &ground, 1.1, config.coyote_time));
        assert!(!jump.allows_jump(false, &ground, 1.1, config.coyote_time));

        jump.press(true, &config, 1.0);
        jump.release(true, &config, 1.0);
        assert!(!jump.allows_jump(true, &ground, 1.1, config.coyote_time));
    }
}
