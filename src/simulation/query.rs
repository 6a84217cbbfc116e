//! Spatial queries used by vehicle agents
//!
//! The simulation never looks at other entities directly. Each tick it asks a
//! `WorldQuery` what is near it, and every answer is optional: absence always
//! means "nothing to react to".

use ordered_float::OrderedFloat;

use super::signal::SignalPhase;
use super::types::{ObstacleId, Position, SignalId, VehicleId};

/// Read-only view of a signal head, taken at tick start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalSnapshot {
    pub id: SignalId,
    pub position: Position,
    pub phase: SignalPhase,
}

/// Read-only view of a vehicle, taken at tick start
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub position: Position,
    pub forward: Position,
    pub speed: f32,
    pub radius: f32,
}

/// A static, non-vehicle collider (barrier, parked object, pedestrian proxy)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Obstacle {
    pub id: ObstacleId,
    pub center: Position,
    pub radius: f32,
    pub layer: u32,
}

/// Walkable surface: an axis-aligned rectangle at a fixed height
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GroundPatch {
    pub min_x: f32,
    pub max_x: f32,
    pub min_z: f32,
    pub max_z: f32,
    pub height: f32,
    pub layer: u32,
}

impl GroundPatch {
    pub fn contains_xz(&self, point: &Position) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.z >= self.min_z && point.z <= self.max_z
    }
}

/// First vehicle struck by a forward probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleHit {
    pub id: VehicleId,
    /// Distance along the probe to the hit surface
    pub distance: f32,
}

/// First obstacle struck by a forward probe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObstacleHit {
    pub id: ObstacleId,
    pub distance: f32,
}

/// Everything a vehicle may ask about its surroundings
pub trait WorldQuery {
    /// All active signal heads
    fn signals(&self) -> &[SignalSnapshot];

    /// Look up a signal by id; `None` if it has been removed
    fn signal(&self, id: SignalId) -> Option<SignalSnapshot> {
        self.signals().iter().find(|s| s.id == id).copied()
    }

    /// Look up a vehicle by id; `None` if it has been removed
    fn vehicle(&self, id: VehicleId) -> Option<VehicleSnapshot>;

    /// Cast a ray of length `range` from `origin` along `forward` and return
    /// the closest vehicle hit, ignoring `exclude`
    fn probe_vehicle(
        &self,
        origin: Position,
        forward: Position,
        range: f32,
        exclude: VehicleId,
    ) -> Option<VehicleHit>;

    /// Cast a ray of length `range` and return the closest static obstacle hit
    fn probe_obstacle(&self, origin: Position, forward: Position, range: f32)
        -> Option<ObstacleHit>;

    /// Is there ground on `layer_mask` below `point`, no further than `max_distance` down?
    fn ground_below(&self, point: Position, max_distance: f32, layer_mask: u32) -> bool;

    /// Does any collider (obstacle or vehicle) overlap the sphere at `point`?
    fn any_collider_within(&self, point: Position, radius: f32) -> bool;

    /// Closest signal whose direction lies inside the forward cone.
    ///
    /// Linear scan over the registry. Callers throttle how often this runs.
    fn nearest_signal_ahead(
        &self,
        origin: Position,
        forward: Position,
        cone: f32,
    ) -> Option<SignalSnapshot> {
        let forward = forward.normalized();
        self.signals()
            .iter()
            .filter(|s| origin.direction_to(&s.position).dot(&forward) > cone)
            .min_by_key(|s| OrderedFloat(origin.distance(&s.position)))
            .copied()
    }
}

/// Distance along a unit-direction ray to the surface of a sphere.
///
/// Returns `Some(0.0)` when the origin already lies inside a sphere whose
/// centre is ahead, and `None` when the sphere is behind, missed, or further
/// than `max_distance`.
pub fn ray_sphere(
    origin: Position,
    direction: Position,
    max_distance: f32,
    center: Position,
    radius: f32,
) -> Option<f32> {
    let m = origin - center;
    let b = m.dot(&direction);
    let c = m.dot(&m) - radius * radius;

    if c <= 0.0 {
        // Origin inside: only a body whose centre is in front counts
        return ((center - origin).dot(&direction) > 0.0).then_some(0.0);
    }
    if b > 0.0 {
        return None;
    }

    let discriminant = b * b - c;
    if discriminant < 0.0 {
        return None;
    }

    let t = -b - discriminant.sqrt();
    (t <= max_distance).then_some(t.max(0.0))
}
