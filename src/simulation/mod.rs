//! Standalone crossing simulation module
//!
//! This module contains all the traffic core logic: the signal cycle, the
//! vehicle decision/motion loop, and the spatial queries that connect them.
//! It runs without any rendering or VR host, so it can be driven and tested
//! from the console.

mod config;
mod crossing;
mod events;
mod query;
mod scene;
mod signal;
mod types;
mod vehicle;
mod world;

// Re-export public types for external use
// These may not be used within this crate but are part of the public API
#[allow(unused_imports)]
pub use config::{ConfigError, SignalTimings, SimConfig, VehicleConfig};
#[allow(unused_imports)]
pub use crossing::{ButtonTransition, CrossingButton, CrossingGate};
#[allow(unused_imports)]
pub use events::{EventRecorder, EventSink, LogSink, SimEvent};
#[allow(unused_imports)]
pub use query::{
    ray_sphere, GroundPatch, Obstacle, ObstacleHit, SignalSnapshot, VehicleHit, VehicleSnapshot,
    WorldQuery,
};
pub use scene::SceneView;
#[allow(unused_imports)]
pub use signal::{PhaseChange, PhaseListener, SignalClock, SignalLamps, SignalPhase};
#[allow(unused_imports)]
pub use types::{
    ButtonId, ObstacleId, Position, SignalId, SimId, VehicleId, ALL_LAYERS, CONVOY_SPEED_FACTOR,
    FOLLOWING_BAND_MULTIPLIER, STOPPED_SPEED_THRESHOLD, VEHICLE_RADIUS, WAYPOINT_ARRIVAL_RADIUS,
};
#[allow(unused_imports)]
pub use vehicle::{Decision, Route, StopCause, VehicleAgent, VehicleState, VehicleUpdate};
#[allow(unused_imports)]
pub use world::{
    SimWorld, MAX_MAP_COLUMNS, MAX_MAP_ROWS, MAX_TEST_VEHICLES, ROAD_LAYER, SIDEWALK_LAYER,
};
