//! Core types for the crossing simulation
//!
//! These are standalone types that don't depend on any engine.

use std::fmt;
use std::ops::{Add, Mul, Sub};

/// A unique identifier for simulation entities
/// This is a simple wrapper around a usize for type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimId(pub usize);

/// A wrapper type for signal head IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SignalId(pub SimId);

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub SimId);

/// A wrapper type for static obstacle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObstacleId(pub SimId);

/// A wrapper type for crossing button IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ButtonId(pub SimId);

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "signal#{}", self.0 .0)
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vehicle#{}", self.0 .0)
    }
}

impl fmt::Display for ButtonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "button#{}", self.0 .0)
    }
}

/// A 3D position (or direction) in the simulation. Y is up.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub const ZERO: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 0.0,
    };

    /// Unit vector along +Z
    pub const FORWARD: Position = Position {
        x: 0.0,
        y: 0.0,
        z: 1.0,
    };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance(&self, other: &Position) -> f32 {
        (*other - *self).length()
    }

    pub fn length(&self) -> f32 {
        self.dot(self).sqrt()
    }

    pub fn dot(&self, other: &Position) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Unit-length copy of this vector, or zero if it has no length
    pub fn normalized(&self) -> Position {
        let len = self.length();
        if len > f32::EPSILON {
            *self * (1.0 / len)
        } else {
            Position::ZERO
        }
    }

    /// Normalized direction from this position toward another
    pub fn direction_to(&self, other: &Position) -> Position {
        (*other - *self).normalized()
    }

    /// Step toward `target` by at most `max_step`, never overshooting
    pub fn move_towards(&self, target: &Position, max_step: f32) -> Position {
        let delta = *target - *self;
        let dist = delta.length();
        if dist <= max_step || dist <= f32::EPSILON {
            *target
        } else {
            *self + delta * (max_step / dist)
        }
    }
}

impl Add for Position {
    type Output = Position;

    fn add(self, rhs: Position) -> Position {
        Position::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Position {
    type Output = Position;

    fn mul(self, rhs: f32) -> Position {
        Position::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Collision radius of a vehicle body in world units
pub const VEHICLE_RADIUS: f32 = 1.0;

/// Speed below which a vehicle is reported as stopped
pub const STOPPED_SPEED_THRESHOLD: f32 = 0.1;

/// Remaining distance at which a waypoint counts as reached
pub const WAYPOINT_ARRIVAL_RADIUS: f32 = 0.5;

/// Leader speed cap inside the following band, as a fraction of normal speed
pub const CONVOY_SPEED_FACTOR: f32 = 0.7;

/// Following band width as a multiple of the follow distance
pub const FOLLOWING_BAND_MULTIPLIER: f32 = 2.0;

/// Layer mask matching every layer
pub const ALL_LAYERS: u32 = u32::MAX;
