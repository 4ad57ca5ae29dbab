//! State marker components.
//!
//! These components mirror the ground sensor's verdict so game code can
//! filter queries on them. They are added and removed by the controller every
//! fixed tick.

use bevy::prelude::*;

/// Marker component indicating the character is grounded.
///
/// Added when any ground probe hits. Removed when the character becomes
/// airborne.
///
/// # Example
///
/// ```rust
/// use bevy::prelude::*;
/// use updraft_controller::state::Grounded;
///
/// fn count_grounded(q: Query<(), With<Grounded>>) -> usize {
///     q.iter().count()
/// }
/// ```
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Grounded;

/// Marker component indicating the character is airborne.
///
/// Mutually exclusive with [`Grounded`].
#[derive(Component, Reflect, Debug, Clone, Copy, Default)]
#[reflect(Component)]
pub struct Airborne;
