//! External effects on the player.
//!
//! Hazards, pickups and game logic never touch controller internals. They
//! send a [`PlayerEffect`] and the controller applies it on the next fixed
//! tick. Slow zones are tracked per source in [`MovementModifiers`] so
//! overlapping zones stack and leaving one restores only its own share.

use bevy::prelude::*;

/// Effect requested on a controlled entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EffectKind {
    /// Add (or drain, when negative) energy. Clamped to the tank.
    AddEnergy(f32),

    /// Jump pad launch.
    ///
    /// With `preserve_horizontal` only the vertical velocity is replaced by
    /// `force`, otherwise the whole velocity is. `bounce_multiplier` adds a
    /// further `force * bounce_multiplier` upward (0 disables it).
    Launch {
        force: f32,
        bounce_multiplier: f32,
        preserve_horizontal: bool,
    },

    /// Wind acceleration for this tick.
    Wind(Vec3),

    /// Entered a slow zone owned by `source`.
    EnterSlowZone {
        source: Entity,
        /// Speed multiplier in `(0, 1]`.
        multiplier: f32,
        /// Close the jump gate while inside.
        forbid_jump: bool,
        /// Seconds the slow keeps applying after leaving.
        linger: f32,
    },

    /// Left the slow zone owned by `source`.
    ExitSlowZone { source: Entity },

    /// Enable or freeze player input.
    SetInputEnabled(bool),
}

/// Effect addressed to a controlled entity.
#[derive(Event, Debug, Clone, Copy)]
pub struct PlayerEffect {
    pub target: Entity,
    pub kind: EffectKind,
}

impl PlayerEffect {
    pub fn new(target: Entity, kind: EffectKind) -> Self {
        Self { target, kind }
    }
}

/// Slow zone currently affecting the player.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct ActiveSlowZone {
    pub source: Entity,
    pub multiplier: f32,
    pub forbid_jump: bool,
    pub linger: f32,
    /// Clock time the zone stops applying, once the player has left it.
    pub expires_at: Option<f32>,
}

/// Movement modifiers stacked from external sources.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct MovementModifiers {
    pub zones: Vec<ActiveSlowZone>,
}

impl MovementModifiers {
    /// Combined speed multiplier of every active zone.
    pub fn speed_multiplier(&self) -> f32 {
        self.zones.iter().map(|zone| zone.multiplier).product()
    }

    /// Whether any active zone forbids jumping.
    pub fn jump_blocked(&self) -> bool {
        self.zones.iter().any(|zone| zone.forbid_jump)
    }

    /// Enter (or re-enter) a zone. Re-entering cancels a pending linger.
    pub fn enter(&mut self, source: Entity, multiplier: f32, forbid_jump: bool, linger: f32) {
        let zone = ActiveSlowZone {
            source,
            multiplier: multiplier.clamp(0.01, 1.0),
            forbid_jump,
            linger: linger.max(0.0),
            expires_at: None,
        };
        match self.zones.iter_mut().find(|z| z.source == source) {
            Some(existing) => *existing = zone,
            None => self.zones.push(zone),
        }
    }

    /// Leave a zone at clock time `now`.
    pub fn exit(&mut self, source: Entity, now: f32) {
        if let Some(zone) = self.zones.iter_mut().find(|z| z.source == source) {
            if zone.linger > 0.0 {
                zone.expires_at = Some(now + zone.linger);
                return;
            }
        }
        self.zones.retain(|z| z.source != source);
    }

    /// Drop zones whose linger has run out.
    pub fn tick(&mut self, now: f32) {
        self.zones
            .retain(|zone| zone.expires_at.is_none_or(|expires| now < expires));
    }
}

/// Velocity after a jump pad launch.
pub fn launch_velocity(current: Vec3, force: f32, bounce_multiplier: f32, preserve_horizontal: bool) -> Vec3 {
    let mut velocity = if preserve_horizontal {
        Vec3::new(current.x, force, current.z)
    } else {
        Vec3::Y * force
    };
    if bounce_multiplier > 0.0 {
        velocity.y += force * bounce_multiplier;
    }
    velocity
}
