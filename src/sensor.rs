//! Ground sensor.
//!
//! A centre ray plus four offset rays are cast straight down from just above
//! the character's foot point. Any hit on the ground groups means grounded.
//! Backends perform the casts (see the `rapier` module) and feed the result
//! into [`GroundState::record`], which also does the coyote-time bookkeeping.

use bevy::prelude::*;

use crate::backend::RaycastRequest;

/// Foot offset synthesized for characters spawned without a [`GroundSensor`].
pub const DEFAULT_FOOT_OFFSET: Vec3 = Vec3::new(0.0, -0.5, 0.0);

/// Fraction of `probe_width` used to spread the four outer probes.
const PROBE_SPREAD: f32 = 0.7;

/// Ground probe geometry.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct GroundSensor {
    /// Foot point relative to the body origin.
    pub foot_offset: Vec3,

    /// Height above the foot point the rays start from.
    pub probe_lift: f32,

    /// Length of every probe ray.
    pub probe_distance: f32,

    /// Footprint width; outer probes sit at `probe_width * 0.7` from the centre.
    pub probe_width: f32,

    /// Collision groups counted as ground (memberships, filters). None = everything.
    pub ground_groups: Option<(u32, u32)>,
}

impl Default for GroundSensor {
    fn default() -> Self {
        Self {
            foot_offset: DEFAULT_FOOT_OFFSET,
            probe_lift: 0.05,
            probe_distance: 1.1,
            probe_width: 0.4,
            ground_groups: None,
        }
    }
}

impl GroundSensor {
    /// Builder: set the foot offset.
    pub fn with_foot_offset(mut self, offset: Vec3) -> Self {
        self.foot_offset = offset;
        self
    }

    /// Builder: set the probe length.
    pub fn with_probe_distance(mut self, distance: f32) -> Self {
        self.probe_distance = distance;
        self
    }

    /// Builder: set the footprint width.
    pub fn with_probe_width(mut self, width: f32) -> Self {
        self.probe_width = width;
        self
    }

    /// Builder: restrict ground to collision groups.
    pub fn with_ground_groups(mut self, memberships: u32, filters: u32) -> Self {
        self.ground_groups = Some((memberships, filters));
        self
    }

    /// Ray origins for a body at `position`: centre first, then +X, -X, +Z, -Z.
    pub fn probe_origins(&self, position: Vec3) -> [Vec3; 5] {
        let foot = position + self.foot_offset + Vec3::Y * self.probe_lift;
        let spread = self.probe_width * PROBE_SPREAD;
        [
            foot,
            foot + Vec3::new(spread, 0.0, 0.0),
            foot + Vec3::new(-spread, 0.0, 0.0),
            foot + Vec3::new(0.0, 0.0, spread),
            foot + Vec3::new(0.0, 0.0, -spread),
        ]
    }

    /// Downward raycast requests for every probe.
    pub fn probe_requests(&self, position: Vec3, exclude: Entity) -> [RaycastRequest; 5] {
        self.probe_origins(position)
            .map(|origin| RaycastRequest::new(origin, Vec3::NEG_Y, self.probe_distance).excluding(exclude))
    }
}

/// Cached ground state for this tick plus coyote bookkeeping.
#[derive(Component, Reflect, Debug, Clone, Copy)]
#[reflect(Component)]
pub struct GroundState {
    /// Whether any probe hit ground this tick.
    pub is_grounded: bool,

    /// Whether the character was grounded last tick.
    pub was_grounded: bool,

    /// Clock time of the last tick spent grounded.
    pub last_grounded_time: f32,

    /// Whether a sensor result has ever been recorded.
    pub(crate) sampled: bool,
}

impl Default for GroundState {
    fn default() -> Self {
        Self {
            is_grounded: false,
            was_grounded: false,
            // Never grounded yet, so no coyote window
            last_grounded_time: f32::NEG_INFINITY,
            sampled: false,
        }
    }
}

impl GroundState {
    /// Record this tick's probe result at clock time `now`.
    pub fn record(&mut self, grounded: bool, now: f32) {
        self.was_grounded = if self.sampled { self.is_grounded } else { grounded };
        self.is_grounded = grounded;
        self.sampled = true;
        if grounded {
            self.last_grounded_time = now;
        }
    }

    /// Grounded this tick after being airborne last tick.
    pub fn just_landed(&self) -> bool {
        self.is_grounded && !self.was_grounded
    }

    /// Airborne this tick after being grounded last tick.
    pub fn just_left_ground(&self) -> bool {
        !self.is_grounded && self.was_grounded
    }

    /// Seconds since the character was last grounded.
    pub fn time_since_grounded(&self, now: f32) -> f32 {
        if self.is_grounded {
            0.0
        } else {
            (now - self.last_grounded_time).max(0.0)
        }
    }
}
