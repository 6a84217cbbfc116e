//! Snapshot-backed implementation of `WorldQuery`
//!
//! `SimWorld` builds one `SceneView` at the start of every tick, so every
//! vehicle reads the same signal phases and vehicle positions regardless of
//! the order in which agents are updated.

use ordered_float::OrderedFloat;

use super::query::{
    ray_sphere, GroundPatch, Obstacle, ObstacleHit, SignalSnapshot, VehicleHit, VehicleSnapshot,
    WorldQuery,
};
use super::types::{Position, VehicleId};

/// Immutable picture of the world for one tick
#[derive(Debug, Clone, Default)]
pub struct SceneView {
    signals: Vec<SignalSnapshot>,
    vehicles: Vec<VehicleSnapshot>,
    obstacles: Vec<Obstacle>,
    ground: Vec<GroundPatch>,
}

impl SceneView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signal(mut self, signal: SignalSnapshot) -> Self {
        self.signals.push(signal);
        self
    }

    pub fn with_vehicle(mut self, vehicle: VehicleSnapshot) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    pub fn with_obstacle(mut self, obstacle: Obstacle) -> Self {
        self.obstacles.push(obstacle);
        self
    }

    pub fn with_ground(mut self, patch: GroundPatch) -> Self {
        self.ground.push(patch);
        self
    }

    pub fn from_parts(
        signals: Vec<SignalSnapshot>,
        vehicles: Vec<VehicleSnapshot>,
        obstacles: Vec<Obstacle>,
        ground: Vec<GroundPatch>,
    ) -> Self {
        Self {
            signals,
            vehicles,
            obstacles,
            ground,
        }
    }

    pub fn vehicles(&self) -> &[VehicleSnapshot] {
        &self.vehicles
    }
}

impl WorldQuery for SceneView {
    fn signals(&self) -> &[SignalSnapshot] {
        &self.signals
    }

    fn vehicle(&self, id: VehicleId) -> Option<VehicleSnapshot> {
        self.vehicles.iter().find(|v| v.id == id).copied()
    }

    fn probe_vehicle(
        &self,
        origin: Position,
        forward: Position,
        range: f32,
        exclude: VehicleId,
    ) -> Option<VehicleHit> {
        let direction = forward.normalized();
        self.vehicles
            .iter()
            .filter(|v| v.id != exclude)
            .filter_map(|v| {
                ray_sphere(origin, direction, range, v.position, v.radius).map(|distance| {
                    VehicleHit {
                        id: v.id,
                        distance,
                    }
                })
            })
            .min_by_key(|hit| OrderedFloat(hit.distance))
    }

    fn probe_obstacle(
        &self,
        origin: Position,
        forward: Position,
        range: f32,
    ) -> Option<ObstacleHit> {
        let direction = forward.normalized();
        self.obstacles
            .iter()
            .filter_map(|o| {
                ray_sphere(origin, direction, range, o.center, o.radius)
                    .map(|distance| ObstacleHit { id: o.id, distance })
            })
            .min_by_key(|hit| OrderedFloat(hit.distance))
    }

    fn ground_below(&self, point: Position, max_distance: f32, layer_mask: u32) -> bool {
        self.ground.iter().any(|patch| {
            patch.layer & layer_mask != 0
                && patch.contains_xz(&point)
                && point.y >= patch.height
                && point.y - patch.height <= max_distance
        })
    }

    fn any_collider_within(&self, point: Position, radius: f32) -> bool {
        let obstacle_hit = self
            .obstacles
            .iter()
            .any(|o| point.distance(&o.center) <= radius + o.radius);
        obstacle_hit
            || self
                .vehicles
                .iter()
                .any(|v| point.distance(&v.position) <= radius + v.radius)
    }
}
