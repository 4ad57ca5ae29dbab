//! Predicate-driven character state machine.
//!
//! One active [`PlayerState`] per character. Every fixed tick the controller
//! builds a [`PlayerSnapshot`] and asks [`transition`] for the next state.
//! Entering a state plays exactly one clip and may fire a sound cue; states
//! never write physics themselves.

use bevy::prelude::*;

use crate::animation::clips;
use crate::config::StateMachineConfig;

/// Discrete character states.
#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerState {
    #[default]
    Idle,
    Move,
    MoveToIdle,
    IdleToMove,
    IdleToCharge,
    Charging,
    Jump {
        /// Whether an airborne tick has been seen since entering.
        seen_airborne: bool,
    },
    Land,
    Grapple,
    TurnLeft,
    TurnRight,
}

impl PlayerState {
    /// Fresh jump state.
    pub const JUMP: Self = Self::Jump {
        seen_airborne: false,
    };

    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Move => "Move",
            Self::MoveToIdle => "MoveToIdle",
            Self::IdleToMove => "IdleToMove",
            Self::IdleToCharge => "IdleToCharge",
            Self::Charging => "Charging",
            Self::Jump { .. } => "Jump",
            Self::Land => "Land",
            Self::Grapple => "Grapple",
            Self::TurnLeft => "TurnLeft",
            Self::TurnRight => "TurnRight",
        }
    }

    /// States that expect the character to stand on the ground.
    pub fn is_grounded_state(&self) -> bool {
        matches!(
            self,
            Self::Idle
                | Self::Move
                | Self::MoveToIdle
                | Self::IdleToMove
                | Self::Land
                | Self::TurnLeft
                | Self::TurnRight
        )
    }
}

/// Direction of a sharp heading change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Turn {
    Left,
    Right,
}

/// Everything a transition may look at for one tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlayerSnapshot {
    pub moving: bool,
    pub jump_pressed: bool,
    pub jump_released: bool,
    pub grounded: bool,
    /// Whether a jump is currently allowed (grounded or coyote, gate open).
    pub can_jump: bool,
    /// Whether the charge jump engine holds a charge.
    pub charging: bool,
    /// Whether a charge jump launched this tick.
    pub launched: bool,
    pub grapple_started: bool,
    pub grapple_ended: bool,
    /// Whether the current state's clip has played to its end.
    pub clip_finished: bool,
    /// Sharp heading change this tick.
    pub turn: Option<Turn>,
}

impl PlayerSnapshot {
    /// A press that started a charge this tick.
    ///
    /// A press refused by a closed jump gate leaves the charge idle and does
    /// not count.
    pub fn charge_started(&self) -> bool {
        self.jump_pressed && self.charging
    }
}

/// Next state for `state` given this tick's snapshot, or `None` to stay.
pub fn transition(
    state: &PlayerState,
    snapshot: &PlayerSnapshot,
    config: &StateMachineConfig,
) -> Option<PlayerState> {
    use PlayerState::*;

    if snapshot.grapple_started && *state != Grapple {
        return Some(Grapple);
    }

    // Any launch re-enters Jump, including a quick tap seen on the same tick
    // and a charge kept from the air firing on landing
    if snapshot.launched {
        return Some(PlayerState::JUMP);
    }

    // Walked off a ledge and the coyote window closed
    if state.is_grounded_state() && !snapshot.grounded && !snapshot.can_jump {
        return Some(Jump {
            seen_airborne: true,
        });
    }

    let charge_entry = || {
        if config.idle_transitions {
            IdleToCharge
        } else {
            Charging
        }
    };
    let settle = |s: &PlayerSnapshot| if s.moving { Move } else { Idle };

    match *state {
        Idle => {
            if snapshot.moving {
                Some(if config.idle_transitions { IdleToMove } else { Move })
            } else if snapshot.charge_started() {
                Some(charge_entry())
            } else {
                None
            }
        }
        IdleToMove => {
            if snapshot.charging {
                Some(Charging)
            } else if !snapshot.moving {
                Some(Idle)
            } else if snapshot.clip_finished {
                Some(Move)
            } else {
                None
            }
        }
        Move => {
            if !snapshot.moving {
                Some(MoveToIdle)
            } else if snapshot.charging {
                Some(Charging)
            } else if config.turn_states {
                snapshot.turn.map(|turn| match turn {
                    Turn::Left => TurnLeft,
                    Turn::Right => TurnRight,
                })
            } else {
                None
            }
        }
        MoveToIdle => {
            if snapshot.moving {
                Some(Move)
            } else if snapshot.charge_started() {
                Some(charge_entry())
            } else if snapshot.clip_finished {
                Some(Idle)
            } else {
                None
            }
        }
        IdleToCharge => {
            if !snapshot.charging {
                Some(settle(snapshot))
            } else if snapshot.jump_released {
                Some(PlayerState::JUMP)
            } else if snapshot.clip_finished {
                Some(Charging)
            } else {
                None
            }
        }
        Charging => {
            if !snapshot.charging {
                // Charge dropped without a launch (gate closed, input frozen)
                Some(settle(snapshot))
            } else if snapshot.jump_released {
                // Released in the air, the kept charge fires on landing
                Some(PlayerState::JUMP)
            } else {
                None
            }
        }
        Jump { seen_airborne } => {
            if snapshot.charge_started() {
                Some(Charging)
            } else if seen_airborne && snapshot.grounded {
                Some(Land)
            } else {
                None
            }
        }
        Land => {
            if snapshot.charge_started() {
                Some(Charging)
            } else if snapshot.clip_finished {
                Some(settle(snapshot))
            } else {
                None
            }
        }
        Grapple => {
            if snapshot.grapple_ended || snapshot.jump_pressed {
                Some(PlayerState::JUMP)
            } else {
                None
            }
        }
        TurnLeft | TurnRight => {
            if snapshot.charge_started() {
                Some(Charging)
            } else if snapshot.clip_finished {
                Some(if snapshot.moving { Move } else { MoveToIdle })
            } else {
                None
            }
        }
    }
}

/// Gate consulted before every transition. Accepts everything.
pub fn can_transition_to(_from: &PlayerState, _to: &PlayerState) -> bool {
    true
}

/// Side effects of entering a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnterAction {
    pub clip: &'static str,
    pub sound: Option<&'static str>,
}

/// Clip and sound cue for entering `state`.
pub fn on_enter(state: &PlayerState) -> EnterAction {
    use PlayerState::*;

    let (clip, sound) = match state {
        Idle => (clips::IDLE, None),
        Move => (clips::MOVE, None),
        MoveToIdle => (clips::MOVE_TO_IDLE, None),
        IdleToMove => (clips::IDLE_TO_MOVE, None),
        IdleToCharge => (clips::IDLE_TO_CHARGE, None),
        Charging => (clips::CHARGING, Some("charge")),
        Jump { .. } => (clips::JUMP, Some("jump")),
        Land => (clips::LAND, Some("land")),
        Grapple => (clips::GRAPPLE, Some("grapple")),
        TurnLeft => (clips::TURN_LEFT, None),
        TurnRight => (clips::TURN_RIGHT, None),
    };
    EnterAction { clip, sound }
}

/// Side effects of leaving a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitAction {
    None,
    StopGrappleVisual,
}

pub fn on_exit(state: &PlayerState) -> ExitAction {
    match state {
        PlayerState::Grapple => ExitAction::StopGrappleVisual,
        _ => ExitAction::None,
    }
}

/// Active state of one character.
#[derive(Component, Reflect, Debug, Clone, Default)]
#[reflect(Component)]
pub struct PlayerStateMachine {
    pub state: PlayerState,
    pub previous: Option<PlayerState>,
    /// Seconds spent in the current state.
    pub elapsed: f32,
    /// Whether the current state's entry action has run.
    pub(crate) entered: bool,
    /// Heading seen on the last tick with move input.
    pub(crate) last_heading: Vec3,
}

impl PlayerStateMachine {
    pub fn current(&self) -> PlayerState {
        self.state
    }

    /// Record per-state observations before transitions are evaluated.
    pub fn observe(&mut self, snapshot: &PlayerSnapshot, dt: f32) {
        self.elapsed += dt;
        if let PlayerState::Jump { seen_airborne } = &mut self.state {
            if !snapshot.grounded {
                *seen_airborne = true;
            }
        }
    }

    /// Evaluate one tick. Returns the `(from, to)` pair when the state changed.
    pub fn step(
        &mut self,
        snapshot: &PlayerSnapshot,
        config: &StateMachineConfig,
    ) -> Option<(PlayerState, PlayerState)> {
        let next = transition(&self.state, snapshot, config)?;
        if !can_transition_to(&self.state, &next) {
            return None;
        }
        let from = self.state;
        self.previous = Some(from);
        self.state = next;
        self.elapsed = 0.0;
        Some((from, next))
    }
}
