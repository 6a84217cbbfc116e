//! Vehicle decision and motion logic for the crossing simulation
//!
//! Standalone implementation that doesn't depend on any engine. A vehicle
//! re-derives its state every tick from what the `WorldQuery` reports; the
//! state is never set from outside.

use log::{debug, info, warn};

use super::config::{ConfigError, VehicleConfig};
use super::query::{VehicleSnapshot, WorldQuery};
use super::types::{
    Position, SignalId, VehicleId, CONVOY_SPEED_FACTOR, FOLLOWING_BAND_MULTIPLIER,
    STOPPED_SPEED_THRESHOLD, VEHICLE_RADIUS, WAYPOINT_ARRIVAL_RADIUS,
};

/// Observable driving state of a vehicle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleState {
    Driving,
    StoppedAtLight,
    StoppedForVehicle,
    StoppedForObstacle,
}

/// Highest-priority reason a vehicle is being held
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StopCause {
    None,
    TrafficLight,
    VehicleAhead,
    Obstacle,
}

impl VehicleState {
    pub fn stop_cause(self) -> StopCause {
        match self {
            VehicleState::Driving => StopCause::None,
            VehicleState::StoppedAtLight => StopCause::TrafficLight,
            VehicleState::StoppedForVehicle => StopCause::VehicleAhead,
            VehicleState::StoppedForObstacle => StopCause::Obstacle,
        }
    }
}

/// Ordered waypoints a vehicle follows, handed over at spawn time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Route {
    pub waypoints: Vec<Position>,
    pub looping: bool,
}

impl Route {
    pub fn new(waypoints: Vec<Position>, looping: bool) -> Self {
        Self { waypoints, looping }
    }

    pub fn looping(waypoints: Vec<Position>) -> Self {
        Self::new(waypoints, true)
    }

    pub fn one_way(waypoints: Vec<Position>) -> Self {
        Self::new(waypoints, false)
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }
}

/// Outcome of the stop tests for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: VehicleState,
    pub target_speed: f32,
}

/// What happened to a vehicle during one update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleUpdate {
    /// Previous and new state, if the state changed this tick
    pub state_change: Option<(VehicleState, VehicleState)>,
    /// Index of the waypoint reached this tick
    pub reached_waypoint: Option<usize>,
    /// Set on the tick a non-looping route is finished
    pub route_completed: bool,
}

/// An autonomous vehicle
#[derive(Debug, Clone)]
pub struct VehicleAgent {
    pub id: VehicleId,
    pub position: Position,
    /// Unit heading
    pub forward: Position,
    config: VehicleConfig,
    route: Route,
    waypoint_index: usize,
    route_complete: bool,
    speed: f32,
    target_speed: f32,
    state: VehicleState,
    /// Weak references, re-resolved by id against each tick's snapshot
    nearest_signal: Option<SignalId>,
    leader: Option<VehicleId>,
    /// Time since the last nearest-signal scan
    scan_timer: f32,
    emergency_stopped: bool,
}

impl VehicleAgent {
    /// Create a vehicle at rest. Heading points at the first waypoint that is
    /// not under the vehicle, or +Z if there is none.
    pub fn new(
        id: VehicleId,
        position: Position,
        route: Route,
        config: VehicleConfig,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let forward = route
            .waypoints
            .iter()
            .map(|wp| position.direction_to(wp))
            .find(|dir| *dir != Position::ZERO)
            .unwrap_or(Position::FORWARD);

        Ok(Self {
            id,
            position,
            forward,
            route_complete: route.is_empty(),
            config,
            route,
            waypoint_index: 0,
            speed: 0.0,
            target_speed: 0.0,
            state: VehicleState::Driving,
            nearest_signal: None,
            leader: None,
            // Scan on the very first update
            scan_timer: config.signal_scan_interval,
            emergency_stopped: false,
        })
    }

    /// Start at a given speed (clamped to the normal speed)
    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed.clamp(0.0, self.config.normal_speed);
        self
    }

    /// Run one simulation step against the world snapshot
    pub fn update(&mut self, delta_secs: f32, world: &dyn WorldQuery) -> VehicleUpdate {
        let mut result = VehicleUpdate::default();
        if !delta_secs.is_finite() || delta_secs < 0.0 {
            warn!("{}: ignoring invalid delta {}", self.id, delta_secs);
            return result;
        }

        self.sense(delta_secs, world);

        let decision = self.decide(world);
        if decision.state != self.state {
            debug!(
                "{}: {:?} -> {:?}",
                self.id, self.state, decision.state
            );
            result.state_change = Some((self.state, decision.state));
            self.state = decision.state;
        }
        if self.emergency_stopped {
            self.speed = 0.0;
            self.target_speed = 0.0;
            return result;
        }
        self.target_speed = decision.target_speed;

        self.integrate_speed(delta_secs);
        self.follow_route(delta_secs, &mut result);

        result
    }

    /// Refresh the tracked signal (throttled) and leader (every tick)
    fn sense(&mut self, delta_secs: f32, world: &dyn WorldQuery) {
        self.scan_timer += delta_secs;
        if self.scan_timer >= self.config.signal_scan_interval {
            self.scan_timer = 0.0;
            self.nearest_signal = world
                .nearest_signal_ahead(
                    self.position,
                    self.forward,
                    self.config.signal_detection_cone,
                )
                .map(|s| s.id);
        } else if let Some(id) = self.nearest_signal {
            if world.signal(id).is_none() {
                debug!("{}: tracked {} is gone", self.id, id);
                self.nearest_signal = None;
            }
        }

        self.leader = world
            .probe_vehicle(
                self.position,
                self.forward,
                self.config.detection_range,
                self.id,
            )
            .map(|hit| hit.id);
    }

    /// Evaluate the stop tests in priority order: light, leader, obstacle
    pub fn decide(&self, world: &dyn WorldQuery) -> Decision {
        let leader = self.leader.and_then(|id| world.vehicle(id));

        let state = if self.should_stop_for_light(world) {
            VehicleState::StoppedAtLight
        } else if self.should_stop_for_vehicle(leader.as_ref()) {
            VehicleState::StoppedForVehicle
        } else if self.should_stop_for_obstacle(world) {
            VehicleState::StoppedForObstacle
        } else {
            VehicleState::Driving
        };

        let target_speed = if state != VehicleState::Driving || self.route_complete {
            0.0
        } else {
            self.cruising_target(leader.as_ref())
        };

        Decision {
            state,
            target_speed,
        }
    }

    fn should_stop_for_light(&self, world: &dyn WorldQuery) -> bool {
        let Some(signal) = self.nearest_signal.and_then(|id| world.signal(id)) else {
            return false;
        };

        let distance = self.position.distance(&signal.position);
        let ahead = self
            .position
            .direction_to(&signal.position)
            .dot(&self.forward);

        distance <= self.config.stopping_distance
            && !signal.phase.is_safe_to_cross()
            && ahead > self.config.signal_ahead_cone
    }

    fn should_stop_for_vehicle(&self, leader: Option<&VehicleSnapshot>) -> bool {
        leader.is_some_and(|l| self.position.distance(&l.position) <= self.config.follow_distance)
    }

    fn should_stop_for_obstacle(&self, world: &dyn WorldQuery) -> bool {
        world
            .probe_obstacle(self.position, self.forward, self.config.stopping_distance)
            .is_some()
    }

    /// Target speed when no stop test holds
    fn cruising_target(&self, leader: Option<&VehicleSnapshot>) -> f32 {
        let band = self.config.follow_distance * FOLLOWING_BAND_MULTIPLIER;
        match leader {
            Some(l) if self.position.distance(&l.position) <= band => l
                .speed
                .clamp(0.0, self.config.normal_speed * CONVOY_SPEED_FACTOR),
            _ => self.config.normal_speed,
        }
    }

    /// Move current speed toward target at the asymmetric rates
    fn integrate_speed(&mut self, delta_secs: f32) {
        if self.speed < self.target_speed {
            self.speed = (self.speed + self.config.acceleration_rate * delta_secs)
                .min(self.target_speed);
        } else if self.speed > self.target_speed {
            self.speed = (self.speed - self.config.deceleration_rate * delta_secs)
                .max(self.target_speed);
        }
        self.speed = self.speed.clamp(0.0, self.config.normal_speed);
    }

    /// Straight-line path following toward the current waypoint
    fn follow_route(&mut self, delta_secs: f32, result: &mut VehicleUpdate) {
        if self.route_complete {
            return;
        }
        let Some(target) = self.route.waypoints.get(self.waypoint_index).copied() else {
            return;
        };

        let step = self.speed * delta_secs;
        if step > 0.0 {
            let heading = self.position.direction_to(&target);
            if heading != Position::ZERO {
                self.forward = heading;
            }
            self.position = self.position.move_towards(&target, step);
        }

        if self.position.distance(&target) < WAYPOINT_ARRIVAL_RADIUS {
            result.reached_waypoint = Some(self.waypoint_index);
            self.advance_waypoint(result);
        }
    }

    fn advance_waypoint(&mut self, result: &mut VehicleUpdate) {
        let next = self.waypoint_index + 1;
        if next < self.route.len() {
            self.waypoint_index = next;
        } else if self.route.looping {
            self.waypoint_index = 0;
        } else {
            self.route_complete = true;
            result.route_completed = true;
            debug!("{} finished its route", self.id);
        }
    }

    /// Force the vehicle to a standstill until `resume_movement`
    pub fn emergency_stop(&mut self) {
        if !self.emergency_stopped {
            info!("{} emergency stop", self.id);
        }
        self.emergency_stopped = true;
        self.speed = 0.0;
        self.target_speed = 0.0;
    }

    /// Clear an emergency stop; the vehicle accelerates from rest again
    pub fn resume_movement(&mut self) {
        if self.emergency_stopped {
            info!("{} resuming", self.id);
        }
        self.emergency_stopped = false;
    }

    pub fn is_emergency_stopped(&self) -> bool {
        self.emergency_stopped
    }

    pub fn current_speed(&self) -> f32 {
        self.speed
    }

    pub fn target_speed(&self) -> f32 {
        self.target_speed
    }

    pub fn current_state(&self) -> VehicleState {
        self.state
    }

    pub fn stop_cause(&self) -> StopCause {
        self.state.stop_cause()
    }

    pub fn is_stopped(&self) -> bool {
        self.speed < STOPPED_SPEED_THRESHOLD
    }

    pub fn nearest_signal(&self) -> Option<SignalId> {
        self.nearest_signal
    }

    pub fn leader(&self) -> Option<VehicleId> {
        self.leader
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Waypoint the vehicle is currently heading for
    pub fn current_waypoint(&self) -> Option<usize> {
        (!self.route.is_empty()).then_some(self.waypoint_index)
    }

    pub fn route_complete(&self) -> bool {
        self.route_complete
    }

    pub fn snapshot(&self) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id,
            position: self.position,
            forward: self.forward,
            speed: self.speed,
            radius: VEHICLE_RADIUS,
        }
    }
}
