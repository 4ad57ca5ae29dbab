//! Grapple hook.
//!
//! A ray from the centre of the player camera picks an anchor. While anchored
//! the pull owns the whole body velocity: locomotion, air modifiers, jumps and
//! external launches all stand down until the hook lets go.

use bevy::prelude::*;

use crate::config::GrappleConfig;
use crate::locomotion::move_towards;

/// How a grapple ended.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrappleEnd {
    /// The body got within the reach threshold of the anchor.
    Reached,
    /// The player let go with the jump button.
    Released,
}

/// Grapple hook state.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct GrappleHook {
    /// Anchor point, if hooked.
    pub anchor: Option<Vec3>,

    /// Cosmetic rope head flying toward the anchor.
    pub visual_head: Vec3,

    /// Whether the rope should be drawn.
    pub visual_enabled: bool,

    /// Set on the tick a grapple starts.
    pub(crate) started: bool,

    /// Set on the tick a grapple ends.
    pub(crate) ended: Option<GrappleEnd>,
}

impl GrappleHook {
    /// Whether the hook is anchored and owns the body velocity.
    pub fn is_active(&self) -> bool {
        self.anchor.is_some()
    }

    /// Whether the grapple started this tick.
    pub fn just_started(&self) -> bool {
        self.started
    }

    /// How the grapple ended this tick, if it did.
    pub fn just_ended(&self) -> Option<GrappleEnd> {
        self.ended
    }

    /// Start grappling from a ray hit, if any.
    ///
    /// Returns the anchor point on success.
    pub fn try_fire(&mut self, hit: Option<Vec3>, tip: Vec3) -> Option<Vec3> {
        let point = hit?;
        self.start(point, tip);
        Some(point)
    }

    /// Anchor at `point`, with the rope head starting at the gun tip.
    pub fn start(&mut self, point: Vec3, tip: Vec3) {
        self.anchor = Some(point);
        self.visual_head = tip;
        self.visual_enabled = true;
        self.started = true;
        self.ended = None;
    }

    /// Advance the cosmetic rope head toward the anchor.
    pub fn update_visual(&mut self, hook_speed: f32, dt: f32) {
        if let Some(anchor) = self.anchor {
            self.visual_head = move_towards(self.visual_head, anchor, hook_speed * dt);
        }
    }

    /// Velocity pulling a body at `position` straight at the anchor.
    pub fn pull_velocity(&self, position: Vec3, pull_speed: f32) -> Option<Vec3> {
        let anchor = self.anchor?;
        Some((anchor - position).normalize_or_zero() * pull_speed)
    }

    /// Whether `position` is within `threshold` of the anchor.
    pub fn has_reached_target(&self, position: Vec3, threshold: f32) -> bool {
        self.anchor
            .is_some_and(|anchor| position.distance(anchor) < threshold)
    }

    /// Clear the anchor and hide the rope.
    pub fn stop(&mut self) {
        self.anchor = None;
        self.visual_enabled = false;
    }

    pub(crate) fn finish(&mut self, end: GrappleEnd) {
        self.stop();
        self.ended = Some(end);
    }

    pub(crate) fn clear_edges(&mut self) {
        self.started = false;
        self.ended = None;
    }
}

/// Sent when a grapple anchors.
#[derive(Event, Debug, Clone, Copy)]
pub struct GrappleStarted {
    pub entity: Entity,
    pub anchor: Vec3,
}

/// Sent when a grapple ends.
#[derive(Event, Debug, Clone, Copy)]
pub struct GrappleEnded {
    pub entity: Entity,
    pub end: GrappleEnd,
}

/// Rope origin for a body at `position`.
pub fn gun_tip(position: Vec3, rotation: Quat, config: &GrappleConfig) -> Vec3 {
    position + rotation * config.tip_offset
}

/// Move every visible rope head toward its anchor. Runs once per rendered frame.
pub fn update_grapple_visuals(time: Res<Time>, mut q_hooks: Query<(&GrappleConfig, &mut GrappleHook)>) {
    let dt = time.delta_secs();
    for (config, mut hook) in &mut q_hooks {
        if hook.visual_enabled {
            hook.update_visual(config.hook_speed, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn miss_does_not_start() {
        let mut hook = GrappleHook::default();
        assert!(hook.try_fire(None, Vec3::ZERO).is_none());
        assert!(!hook.is_active());
    }

    #[test]
    fn hit_anchors_and_shows_rope() {
        let mut hook = GrappleHook::default();
        let anchor = Vec3::new(0.0, 10.0, -10.0);
        assert_eq!(hook.try_fire(Some(anchor), Vec3::Y), Some(anchor));
        assert!(hook.is_active());
        assert!(hook.just_started());
        assert!(hook.visual_enabled);
        assert_eq!(hook.visual_head, Vec3::Y);
    }

    #[test]
    fn pull_points_at_anchor_with_pull_speed() {
        let mut hook = GrappleHook::default();
        hook.start(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO);
        let v = hook.pull_velocity(Vec3::ZERO, 15.0).expect("anchored");
        assert!((v - Vec3::new(0.0, 0.0, -15.0)).length() < 1e-4);
    }

    #[test]
    fn reach_threshold() {
        let mut hook = GrappleHook::default();
        hook.start(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO);
        assert!(!hook.has_reached_target(Vec3::ZERO, 1.5));
        assert!(hook.has_reached_target(Vec3::new(0.0, 0.0, -9.0), 1.5));
    }

    #[test]
    fn rope_head_moves_at_hook_speed_without_overshoot() {
        let mut hook = GrappleHook::default();
        hook.start(Vec3::new(0.0, 0.0, -10.0), Vec3::ZERO);
        hook.update_visual(40.0, 0.1);
        assert!((hook.visual_head.z + 4.0).abs() < 1e-4);
        hook.update_visual(40.0, 1.0);
        assert_eq!(hook.visual_head, Vec3::new(0.0, 0.0, -10.0));
    }

    #[test]
    fn finish_clears_anchor() {
        let mut hook = GrappleHook::default();
        hook.start(Vec3::X, Vec3::ZERO);
        hook.finish(GrappleEnd::Reached);
        assert!(!hook.is_active());
        assert!(!hook.visual_enabled);
        assert_eq!(hook.just_ended(), Some(GrappleEnd::Reached));
        assert!(hook.pull_velocity(Vec3::ZERO, 15.0).is_none());
    }
}
