//! Animation and sound surface.
//!
//! The controller does not play animations itself. State machines call
//! [`ClipPlayer::play`], which tracks which clip is current and how far it has
//! run, and send a [`ClipRequested`] event for the game's animation graph.
//! Sound cues are fire-and-forget [`SoundCue`] events.

use bevy::platform::collections::HashMap;
use bevy::prelude::*;

use crate::ControllerClock;

/// Clip names used by the controller.
pub mod clips {
    pub const IDLE: &str = "Idle";
    pub const MOVE: &str = "Move";
    pub const MOVE_TO_IDLE: &str = "MoveToIdle";
    pub const IDLE_TO_MOVE: &str = "IdleToMove";
    pub const IDLE_TO_CHARGE: &str = "IdleToCharge";
    pub const CHARGING: &str = "Charging";
    pub const JUMP: &str = "Jump";
    pub const LAND: &str = "Land";
    pub const GRAPPLE: &str = "Grapple";
    pub const TURN_LEFT: &str = "TurnLeft";
    pub const TURN_RIGHT: &str = "TurnRight";
}

/// Clip durations in seconds, keyed by clip name.
///
/// Clips without an entry loop forever and never complete.
#[derive(Resource, Debug, Clone)]
pub struct ClipLibrary {
    pub durations: HashMap<String, f32>,
}

impl Default for ClipLibrary {
    fn default() -> Self {
        let mut durations = HashMap::default();
        for (name, seconds) in [
            (clips::MOVE_TO_IDLE, 0.25),
            (clips::IDLE_TO_MOVE, 0.2),
            (clips::IDLE_TO_CHARGE, 0.15),
            (clips::JUMP, 0.5),
            (clips::LAND, 0.3),
            (clips::TURN_LEFT, 0.3),
            (clips::TURN_RIGHT, 0.3),
        ] {
            durations.insert(name.to_string(), seconds);
        }
        Self { durations }
    }
}

impl ClipLibrary {
    /// Set a clip's duration.
    pub fn with_clip(mut self, name: impl Into<String>, seconds: f32) -> Self {
        self.durations.insert(name.into(), seconds);
        self
    }

    /// Duration of a one-shot clip, `None` for looping or unknown clips.
    pub fn duration(&self, name: &str) -> Option<f32> {
        self.durations.get(name).copied().filter(|d| *d > 0.0)
    }
}

/// Current clip of one animated character.
#[derive(Component, Reflect, Debug, Clone)]
#[reflect(Component)]
pub struct ClipPlayer {
    pub clip: String,
    pub transition_time: f32,
    pub layer: u32,
    pub elapsed: f32,
    pub speed: f32,
}

impl Default for ClipPlayer {
    fn default() -> Self {
        Self {
            clip: clips::IDLE.to_string(),
            transition_time: 0.0,
            layer: 0,
            elapsed: 0.0,
            speed: 1.0,
        }
    }
}

impl ClipPlayer {
    /// Start `clip` from the beginning.
    pub fn play(&mut self, clip: &str, transition_time: f32, layer: u32) {
        self.clip.clear();
        self.clip.push_str(clip);
        self.transition_time = transition_time;
        self.layer = layer;
        self.elapsed = 0.0;
        self.speed = 1.0;
    }

    /// Whether `clip` is the current clip.
    pub fn is_playing(&self, clip: &str) -> bool {
        self.clip == clip
    }

    /// Progress of the current clip; 1.0 and above means complete.
    ///
    /// Looping clips report 0.
    pub fn normalized_time(&self, library: &ClipLibrary) -> f32 {
        match library.duration(&self.clip) {
            Some(duration) => self.elapsed / duration,
            None => 0.0,
        }
    }

    /// Whether `clip` is current and has run to its end.
    pub fn is_complete(&self, clip: &str, library: &ClipLibrary) -> bool {
        self.is_playing(clip) && library.duration(clip).is_some() && self.normalized_time(library) >= 1.0
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt * self.speed;
    }
}

/// Sent when a state machine wants a clip played.
#[derive(Event, Debug, Clone)]
pub struct ClipRequested {
    pub entity: Entity,
    pub clip: String,
    pub transition_time: f32,
    pub layer: u32,
}

/// Fire-and-forget sound trigger.
#[derive(Event, Debug, Clone, Copy)]
pub struct SoundCue {
    pub entity: Entity,
    pub cue: &'static str,
}

/// Advance every clip clock by the fixed timestep.
pub fn advance_clip_players(clock: Res<ControllerClock>, mut q_players: Query<&mut ClipPlayer>) {
    for mut player in &mut q_players {
        player.advance(clock.delta());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_clip_completes() {
        let library = ClipLibrary::default();
        let mut player = ClipPlayer::default();
        player.play(clips::LAND, 0.1, 0);
        assert!(!player.is_complete(clips::LAND, &library));

        player.advance(0.15);
        assert!((player.normalized_time(&library) - 0.5).abs() < 1e-4);

        player.advance(0.15);
        assert!(player.is_complete(clips::LAND, &library));
        assert!(!player.is_complete(clips::MOVE_TO_IDLE, &library));
    }

    #[test]
    fn looping_clip_never_completes() {
        let library = ClipLibrary::default();
        let mut player = ClipPlayer::default();
        player.play(clips::MOVE, 0.1, 0);
        player.advance(100.0);
        assert!(!player.is_complete(clips::MOVE, &library));
        assert_eq!(player.normalized_time(&library), 0.0);
    }

    #[test]
    fn library_override() {
        let library = ClipLibrary::default().with_clip(clips::LAND, 1.0);
        assert_eq!(library.duration(clips::LAND), Some(1.0));
        assert_eq!(library.duration(clips::IDLE), None);
    }
}
