//! Main simulation world that ties everything together
//!
//! This is the entry point for running the crossing simulation without any
//! engine. The host calls `tick` at a fixed rate; everything else is a query
//! or a setup call.

use anyhow::{Context, Result};
use log::warn;
use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use std::collections::HashMap;

use super::config::{SignalTimings, SimConfig, VehicleConfig};
use super::crossing::{CrossingButton, CrossingGate};
use super::events::{EventSink, SimEvent};
use super::query::{GroundPatch, Obstacle};
use super::scene::SceneView;
use super::signal::{SignalClock, SignalPhase};
use super::types::{
    ButtonId, ObstacleId, Position, SignalId, SimId, VehicleId, ALL_LAYERS,
};
use super::vehicle::{Route, VehicleAgent};

/// Ground layer for the carriageway
pub const ROAD_LAYER: u32 = 1 << 0;

/// Ground layer for sidewalks and the crosswalk
pub const SIDEWALK_LAYER: u32 = 1 << 1;

/// Most vehicles the test intersection will place
pub const MAX_TEST_VEHICLES: usize = 14;

/// Half-length of the test road along Z
const TEST_ROAD_HALF_LENGTH: f32 = 40.0;

/// Lateral offset of each lane centre from the road axis
const TEST_LANE_OFFSET: f32 = 2.0;

/// Largest grid `render_map` produces
pub const MAX_MAP_COLUMNS: usize = 120;
pub const MAX_MAP_ROWS: usize = 60;

/// The main simulation world
pub struct SimWorld {
    /// All signal heads
    pub signals: HashMap<SignalId, SignalClock>,

    /// All vehicles
    pub vehicles: HashMap<VehicleId, VehicleAgent>,

    /// All static obstacles
    pub obstacles: HashMap<ObstacleId, Obstacle>,

    /// Walkable/drivable surfaces
    pub ground: Vec<GroundPatch>,

    /// Pedestrian crossing buttons
    pub buttons: HashMap<ButtonId, CrossingButton>,

    /// Default parameters for new signals and vehicles
    config: SimConfig,

    /// Receivers of simulation events
    sinks: Vec<Box<dyn EventSink>>,

    /// Next ID to assign
    next_id: usize,

    /// Simulation time
    pub time: f32,

    /// Optional seeded RNG for reproducible simulations
    rng: Option<StdRng>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    fn new_internal(config: SimConfig, rng: Option<StdRng>) -> Self {
        Self {
            signals: HashMap::new(),
            vehicles: HashMap::new(),
            obstacles: HashMap::new(),
            ground: Vec::new(),
            buttons: HashMap::new(),
            config,
            sinks: Vec::new(),
            next_id: 0,
            time: 0.0,
            rng,
        }
    }

    pub fn new() -> Self {
        Self::new_internal(SimConfig::default(), None)
    }

    /// Create a new SimWorld with a seeded RNG for reproducible simulations
    pub fn new_with_seed(seed: u64) -> Self {
        Self::new_internal(SimConfig::default(), Some(StdRng::seed_from_u64(seed)))
    }

    /// Create a SimWorld with custom defaults, validating them first
    pub fn with_config(config: SimConfig, seed: Option<u64>) -> Result<Self> {
        config.validate().context("Invalid simulation config")?;
        Ok(Self::new_internal(config, seed.map(StdRng::seed_from_u64)))
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Get a random value in the given range, using seeded RNG if available
    fn random_range(&mut self, range: std::ops::Range<f32>) -> f32 {
        match &mut self.rng {
            Some(rng) => rng.random_range(range),
            None => rand::rng().random_range(range),
        }
    }

    fn next_sim_id(&mut self) -> SimId {
        let id = SimId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Register an event receiver
    pub fn add_sink(&mut self, sink: impl EventSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    fn publish(&mut self, events: &[SimEvent]) {
        for sink in &mut self.sinks {
            for event in events {
                sink.emit(event);
            }
        }
    }

    /// Add a signal head with the default timings and start its cycle
    pub fn add_signal(&mut self, position: Position) -> Result<SignalId> {
        let timings = self.config.signal;
        self.add_signal_with_timings(position, timings)
    }

    /// Add a signal head with explicit timings and start its cycle
    pub fn add_signal_with_timings(
        &mut self,
        position: Position,
        timings: SignalTimings,
    ) -> Result<SignalId> {
        let id = SignalId(self.next_sim_id());
        let mut clock = SignalClock::new(id, position, timings)
            .with_context(|| format!("Invalid timings for {}", id))?;
        let change = clock.start();
        self.signals.insert(id, clock);
        self.publish(&[SimEvent::PhaseChanged(change)]);
        Ok(id)
    }

    /// Restart a signal's cycle from Stop
    pub fn start_signal(&mut self, id: SignalId) -> Result<()> {
        let change = self
            .signals
            .get_mut(&id)
            .context("Signal not found")?
            .start();
        self.publish(&[SimEvent::PhaseChanged(change)]);
        Ok(())
    }

    /// Freeze a signal at its current phase
    pub fn stop_signal(&mut self, id: SignalId) -> Result<()> {
        self.signals
            .get_mut(&id)
            .context("Signal not found")?
            .stop();
        Ok(())
    }

    /// Remove a signal. Vehicles tracking it drop the reference on their next tick.
    pub fn remove_signal(&mut self, id: SignalId) -> Option<SignalClock> {
        let removed = self.signals.remove(&id);
        if removed.is_some() {
            self.buttons.retain(|_, b| b.signal != id);
        }
        removed
    }

    pub fn signal_phase(&self, id: SignalId) -> Option<SignalPhase> {
        self.signals.get(&id).map(|s| s.phase())
    }

    /// Pedestrian crossing predicate; false for unknown signals
    pub fn is_safe_to_cross(&self, id: SignalId) -> bool {
        CrossingGate::new(id).permits(self.signal_phase(id))
    }

    /// Add a vehicle with the default vehicle config
    pub fn add_vehicle(&mut self, position: Position, route: Route) -> Result<VehicleId> {
        let config = self.config.vehicle;
        self.add_vehicle_with_config(position, route, config)
    }

    /// Add a vehicle with explicit driving parameters
    pub fn add_vehicle_with_config(
        &mut self,
        position: Position,
        route: Route,
        config: VehicleConfig,
    ) -> Result<VehicleId> {
        let id = VehicleId(self.next_sim_id());
        let vehicle = VehicleAgent::new(id, position, route, config)
            .with_context(|| format!("Invalid config for {}", id))?;
        self.vehicles.insert(id, vehicle);
        Ok(id)
    }

    /// Despawn a vehicle. Followers drop the reference on their next tick.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> Option<VehicleAgent> {
        self.vehicles.remove(&id)
    }

    pub fn add_obstacle(&mut self, center: Position, radius: f32) -> ObstacleId {
        let id = ObstacleId(self.next_sim_id());
        self.obstacles.insert(
            id,
            Obstacle {
                id,
                center,
                radius,
                layer: ALL_LAYERS,
            },
        );
        id
    }

    pub fn remove_obstacle(&mut self, id: ObstacleId) -> Option<Obstacle> {
        self.obstacles.remove(&id)
    }

    pub fn add_ground(&mut self, patch: GroundPatch) {
        self.ground.push(patch);
    }

    /// Attach a crossing button to an existing signal
    pub fn add_button(&mut self, signal: SignalId, position: Position) -> Result<ButtonId> {
        if !self.signals.contains_key(&signal) {
            anyhow::bail!("Cannot attach button to missing {}", signal);
        }
        let id = ButtonId(self.next_sim_id());
        self.buttons
            .insert(id, CrossingButton::new(id, signal, position));
        Ok(id)
    }

    /// Press a button. Returns whether the press registered.
    pub fn press_button(&mut self, id: ButtonId) -> Result<bool> {
        let button = self.buttons.get_mut(&id).context("Button not found")?;
        let signal = button.signal;
        match button.press() {
            Some(transition) => {
                self.publish(&[SimEvent::from_button(id, signal, transition)]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Release a button. Returns whether the release registered.
    pub fn release_button(&mut self, id: ButtonId) -> Result<bool> {
        let button = self.buttons.get_mut(&id).context("Button not found")?;
        let signal = button.signal;
        match button.release() {
            Some(transition) => {
                self.publish(&[SimEvent::from_button(id, signal, transition)]);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn emergency_stop(&mut self, id: VehicleId) -> Result<()> {
        self.vehicles
            .get_mut(&id)
            .context("Vehicle not found")?
            .emergency_stop();
        self.publish(&[SimEvent::EmergencyStop { vehicle: id }]);
        Ok(())
    }

    pub fn resume_vehicle(&mut self, id: VehicleId) -> Result<()> {
        self.vehicles
            .get_mut(&id)
            .context("Vehicle not found")?
            .resume_movement();
        self.publish(&[SimEvent::Resumed { vehicle: id }]);
        Ok(())
    }

    /// Halt every vehicle (external safety trigger)
    pub fn emergency_stop_all(&mut self) {
        let mut events = Vec::new();
        for id in self.sorted_vehicle_ids() {
            if let Some(vehicle) = self.vehicles.get_mut(&id) {
                vehicle.emergency_stop();
                events.push(SimEvent::EmergencyStop { vehicle: id });
            }
        }
        self.publish(&events);
    }

    pub fn resume_all(&mut self) {
        let mut events = Vec::new();
        for id in self.sorted_vehicle_ids() {
            if let Some(vehicle) = self.vehicles.get_mut(&id) {
                if vehicle.is_emergency_stopped() {
                    vehicle.resume_movement();
                    events.push(SimEvent::Resumed { vehicle: id });
                }
            }
        }
        self.publish(&events);
    }

    fn sorted_vehicle_ids(&self) -> Vec<VehicleId> {
        let mut ids: Vec<VehicleId> = self.vehicles.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Immutable picture of the world as it stands right now
    pub fn scene(&self) -> SceneView {
        let mut signals: Vec<_> = self.signals.values().map(|s| s.snapshot()).collect();
        signals.sort_by_key(|s| s.id);
        let mut vehicles: Vec<_> = self.vehicles.values().map(|v| v.snapshot()).collect();
        vehicles.sort_by_key(|v| v.id);
        let mut obstacles: Vec<_> = self.obstacles.values().copied().collect();
        obstacles.sort_by_key(|o| o.id);
        SceneView::from_parts(signals, vehicles, obstacles, self.ground.clone())
    }

    /// Advance all signal clocks, collecting their transitions
    fn update_signals(&mut self, delta_secs: f32) -> Vec<SimEvent> {
        let mut ids: Vec<SignalId> = self.signals.keys().copied().collect();
        ids.sort();

        let mut events = Vec::new();
        for id in ids {
            if let Some(signal) = self.signals.get_mut(&id) {
                events.extend(signal.tick(delta_secs).into_iter().map(SimEvent::PhaseChanged));
            }
        }
        events
    }

    /// Update every vehicle against one shared snapshot
    fn update_vehicles(&mut self, delta_secs: f32, scene: &SceneView) -> Vec<SimEvent> {
        let mut events = Vec::new();
        for id in self.sorted_vehicle_ids() {
            let Some(vehicle) = self.vehicles.get_mut(&id) else {
                continue;
            };
            let update = vehicle.update(delta_secs, scene);
            if let Some((from, to)) = update.state_change {
                events.push(SimEvent::VehicleStateChanged {
                    vehicle: id,
                    from,
                    to,
                });
            }
        }
        events
    }

    /// Main simulation tick
    pub fn tick(&mut self, delta_secs: f32) {
        if !delta_secs.is_finite() || delta_secs <= 0.0 {
            warn!("Ignoring invalid tick delta {}", delta_secs);
            return;
        }
        self.time += delta_secs;

        // Signals first, so vehicles see this tick's phases
        let mut events = self.update_signals(delta_secs);

        let scene = self.scene();
        events.extend(self.update_vehicles(delta_secs, &scene));

        self.publish(&events);
    }

    /// Create the default test crossing with four vehicles
    pub fn create_test_world() -> Self {
        Self::build_test_world(Self::new(), 4)
    }

    pub fn create_test_world_with_seed(seed: u64) -> Self {
        Self::build_test_world(Self::new_with_seed(seed), 4)
    }

    /// Populate a world with a two-lane road, a signalled crosswalk at z=0
    /// and `vehicle_count` vehicles looping the road in both directions.
    pub fn build_test_world(mut world: SimWorld, vehicle_count: usize) -> Self {
        let half = TEST_ROAD_HALF_LENGTH;
        let lane = TEST_LANE_OFFSET;

        world.add_ground(GroundPatch {
            min_x: -2.0 * lane,
            max_x: 2.0 * lane,
            min_z: -half,
            max_z: half,
            height: 0.0,
            layer: ROAD_LAYER,
        });
        for side in [-1.0_f32, 1.0] {
            let inner = side * 2.0 * lane;
            let outer = side * (2.0 * lane + 3.0);
            world.add_ground(GroundPatch {
                min_x: inner.min(outer),
                max_x: inner.max(outer),
                min_z: -half,
                max_z: half,
                height: 0.2,
                layer: SIDEWALK_LAYER,
            });
        }
        world.add_ground(GroundPatch {
            min_x: -2.0 * lane,
            max_x: 2.0 * lane,
            min_z: -1.5,
            max_z: 1.5,
            height: 0.0,
            layer: SIDEWALK_LAYER,
        });

        let signal_heads = [
            Position::new(lane + 1.5, 0.0, -4.0),
            Position::new(-lane - 1.5, 0.0, 4.0),
        ];
        for head in signal_heads {
            match world.add_signal(head) {
                Ok(signal) => {
                    let button_pos = Position::new(head.x.signum() * (2.0 * lane + 1.0), 1.0, 0.0);
                    if let Err(e) = world.add_button(signal, button_pos) {
                        warn!("Failed to add crossing button: {:#}", e);
                    }
                }
                Err(e) => warn!("Failed to add signal: {:#}", e),
            }
        }

        let northbound = Route::looping(vec![
            Position::new(lane, 0.0, half),
            Position::new(-lane, 0.0, half),
            Position::new(-lane, 0.0, -half),
            Position::new(lane, 0.0, -half),
        ]);
        let southbound = Route::looping(vec![
            Position::new(-lane, 0.0, -half),
            Position::new(lane, 0.0, -half),
            Position::new(lane, 0.0, half),
            Position::new(-lane, 0.0, half),
        ]);

        let base = world.config.vehicle;
        for i in 0..vehicle_count.min(MAX_TEST_VEHICLES) {
            let slot = (i / 2) as f32;
            let offset = world.random_range(0.0..2.0);
            let (position, route) = if i % 2 == 0 {
                (
                    Position::new(lane, 0.0, -half + 10.0 * slot + offset),
                    northbound.clone(),
                )
            } else {
                (
                    Position::new(-lane, 0.0, half - 10.0 * slot - offset),
                    southbound.clone(),
                )
            };

            let config = VehicleConfig {
                normal_speed: base.normal_speed * world.random_range(0.8..1.0),
                ..base
            };
            if let Err(e) = world.add_vehicle_with_config(position, route, config) {
                warn!("Failed to add test vehicle: {:#}", e);
            }
        }

        world
    }

    /// Print a summary of the current world state
    pub fn print_summary(&self) {
        println!("=== Simulation Summary (t={:.1}s) ===", self.time);

        println!("--- Signals ---");
        let mut signals: Vec<&SignalClock> = self.signals.values().collect();
        signals.sort_by_key(|s| s.id);
        for signal in signals {
            println!(
                "  Signal {:?}: phase={:?}, remaining={:.1}s, cycles={}, safe_to_cross={}",
                signal.id.0 .0,
                signal.phase(),
                signal.time_remaining(),
                signal.cycles_completed(),
                signal.is_safe_to_cross()
            );
        }

        if !self.vehicles.is_empty() {
            println!("--- Vehicles ---");
            for id in self.sorted_vehicle_ids() {
                let Some(vehicle) = self.vehicles.get(&id) else {
                    continue;
                };
                println!(
                    "  Vehicle {:?}: state={:?}, speed={:.2}/{:.2}, position=({:.1}, {:.1}), waypoint={:?}{}",
                    id.0 .0,
                    vehicle.current_state(),
                    vehicle.current_speed(),
                    vehicle.target_speed(),
                    vehicle.position.x,
                    vehicle.position.z,
                    vehicle.current_waypoint(),
                    if vehicle.is_emergency_stopped() {
                        " [EMERGENCY]"
                    } else {
                        ""
                    }
                );
            }
        }

        let stopped = self.vehicles.values().filter(|v| v.is_stopped()).count();
        println!("Vehicles stopped: {}/{}", stopped, self.vehicles.len());
    }

    /// Draw a visual map of the world in the terminal
    pub fn draw_map(&self) {
        println!("{}", self.render_map());
    }

    /// ASCII top-down view, north (+z) up, fitted into at most
    /// `MAX_MAP_COLUMNS` x `MAX_MAP_ROWS` cells
    pub fn render_map(&self) -> String {
        let mut points: Vec<Position> = self.signals.values().map(|s| s.position).collect();
        points.extend(self.vehicles.values().map(|v| v.position));
        points.extend(self.obstacles.values().map(|o| o.center));
        points.extend(
            self.vehicles
                .values()
                .flat_map(|v| v.route().waypoints.iter().copied()),
        );
        points.retain(|p| p.x.is_finite() && p.z.is_finite());

        let mut out = String::from("\n=== World Map ===\n");
        if points.is_empty() {
            out.push_str("(empty)\n");
            return out;
        }

        let mut min_x = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut min_z = f32::INFINITY;
        let mut max_z = f32::NEG_INFINITY;
        for p in &points {
            min_x = min_x.min(p.x);
            max_x = max_x.max(p.x);
            min_z = min_z.min(p.z);
            max_z = max_z.max(p.z);
        }

        // Add padding
        min_x -= 2.0;
        max_x += 2.0;
        min_z -= 2.0;
        max_z += 2.0;

        // One column per world unit, one row per two units, shrunk to fit
        let col_scale = 1.0_f32.min((MAX_MAP_COLUMNS - 1) as f32 / (max_x - min_x));
        let row_scale = 0.5_f32.min((MAX_MAP_ROWS - 1) as f32 / (max_z - min_z));
        let width = (((max_x - min_x) * col_scale) as usize + 1).min(MAX_MAP_COLUMNS);
        let height = (((max_z - min_z) * row_scale) as usize + 1).min(MAX_MAP_ROWS);

        let mut grid = vec![vec![' '; width]; height];

        let to_grid = |p: &Position| -> Option<(usize, usize)> {
            if !p.x.is_finite() || !p.z.is_finite() {
                return None;
            }
            let col = ((p.x - min_x) * col_scale) as usize;
            let row = ((max_z - p.z) * row_scale) as usize;
            Some((row.min(height - 1), col.min(width - 1)))
        };

        for waypoint in self
            .vehicles
            .values()
            .flat_map(|v| v.route().waypoints.iter())
        {
            if let Some((row, col)) = to_grid(waypoint) {
                grid[row][col] = '.';
            }
        }

        for obstacle in self.obstacles.values() {
            if let Some((row, col)) = to_grid(&obstacle.center) {
                grid[row][col] = '#';
            }
        }

        for signal in self.signals.values() {
            if let Some((row, col)) = to_grid(&signal.position) {
                grid[row][col] = signal.phase().symbol();
            }
        }

        for vehicle in self.vehicles.values() {
            if let Some((row, col)) = to_grid(&vehicle.position) {
                grid[row][col] = if vehicle.is_stopped() { 'c' } else { 'C' };
            }
        }

        out.push_str("Legend: R/Y/G=Signal, C=Vehicle (c=stopped), #=Obstacle, .=Waypoint\n\n");
        for row in &grid {
            let line: String = row.iter().collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}
