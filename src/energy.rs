//! Energy and high-energy mode.

use bevy::prelude::*;

use crate::config::ControllerConfig;

/// Energy resource and the high-energy buff flag.
///
/// While the buff is on, energy drains; the moment it reaches the threshold
/// the buff switches off and stays off until toggled again.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
pub struct Energy {
    /// Current energy in `[0, max]`.
    pub current: f32,
    /// Capacity.
    pub max: f32,
    /// Whether high-energy mode is on.
    pub high_energy: bool,
}

impl Default for Energy {
    fn default() -> Self {
        Self::full(ControllerConfig::default().max_energy)
    }
}

/// Why high-energy mode changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnergyChange {
    Enabled,
    Disabled,
    Depleted,
}

/// Sent whenever high-energy mode switches on or off.
#[derive(Event, Debug, Clone, Copy)]
pub struct HighEnergyChanged {
    pub entity: Entity,
    pub enabled: bool,
    pub change: EnergyChange,
    pub energy: f32,
}

impl Energy {
    /// Full tank of `max` energy, buff off.
    pub fn full(max: f32) -> Self {
        let max = max.max(0.0);
        Self {
            current: max,
            max,
            high_energy: false,
        }
    }

    /// Toggle high-energy mode.
    ///
    /// Enabling is refused (returns `None`) when energy is at or below `threshold`.
    pub fn toggle(&mut self, threshold: f32) -> Option<EnergyChange> {
        if self.high_energy {
            self.high_energy = false;
            return Some(EnergyChange::Disabled);
        }
        if self.current <= threshold {
            return None;
        }
        self.high_energy = true;
        Some(EnergyChange::Enabled)
    }

    /// Add (or remove, for negative amounts) energy, clamped to `[0, max]`.
    pub fn add(&mut self, amount: f32) {
        if !amount.is_finite() {
            self.current = if amount > 0.0 { self.max } else { 0.0 };
            return;
        }
        self.current = (self.current + amount).clamp(0.0, self.max);
    }

    /// Drain or recharge for `dt` seconds.
    ///
    /// Returns `Some(EnergyChange::Depleted)` on the tick the buff auto-disables.
    pub fn tick(&mut self, dt: f32, config: &ControllerConfig) -> Option<EnergyChange> {
        if self.high_energy {
            self.add(-config.energy_consumption_rate * dt);
            if self.current <= config.min_energy_threshold {
                self.high_energy = false;
                return Some(EnergyChange::Depleted);
            }
        } else if config.energy_recharge_rate > 0.0 {
            self.add(config.energy_recharge_rate * dt);
        }
        None
    }

    /// Fill fraction in `[0, 1]`.
    pub fn percentage(&self) -> f32 {
        if self.max <= 0.0 {
            0.0
        } else {
            self.current / self.max
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cannot_enable_at_or_below_threshold() {
        let mut energy = Energy::full(100.0);
        energy.current = 5.0;
        assert_eq!(energy.toggle(5.0), None);
        assert!(!energy.high_energy);

        energy.current = 5.1;
        assert_eq!(energy.toggle(5.0), Some(EnergyChange::Enabled));
        assert!(energy.high_energy);
    }

    #[test]
    fn toggle_off_always_allowed() {
        let mut energy = Energy::full(100.0);
        energy.toggle(5.0);
        energy.current = 1.0;
        assert_eq!(energy.toggle(5.0), Some(EnergyChange::Disabled));
    }

    #[test]
    fn drains_and_auto_disables_within_one_tick() {
        let config = ControllerConfig::default();
        let mut energy = Energy::full(100.0);
        energy.current = 5.1;
        energy.toggle(config.min_energy_threshold);

        // 10/s for 1/60 s crosses the threshold in one tick
        assert_eq!(energy.tick(1.0 / 60.0, &config), Some(EnergyChange::Depleted));
        assert!(!energy.high_energy);

        // One way: no re-enable while ticking
        energy.tick(1.0, &config.with_energy_recharge(100.0));
        assert!(!energy.high_energy);
    }

    #[test]
    fn recharges_only_when_off() {
        let config = ControllerConfig::default().with_energy_recharge(10.0);
        let mut energy = Energy::full(100.0);
        energy.current = 50.0;
        energy.tick(1.0, &config);
        assert!((energy.current - 60.0).abs() < 1e-4);

        energy.toggle(config.min_energy_threshold);
        energy.tick(1.0, &config);
        assert!((energy.current - 50.0).abs() < 1e-4);
    }

    #[test]
    fn add_is_clamped() {
        let mut energy = Energy::full(100.0);
        energy.add(1e9);
        assert_eq!(energy.current, 100.0);
        energy.add(-1e9);
        assert_eq!(energy.current, 0.0);
        energy.add(f32::INFINITY);
        assert_eq!(energy.current, 100.0);
        energy.add(f32::NEG_INFINITY);
        assert_eq!(energy.current, 0.0);
        energy.add(f32::NAN);
        assert_eq!(energy.current, 0.0);
        assert_eq!(energy.percentage(), 0.0);
    }
}
