//! Vehicle decision and motion tests
//!
//! These drive a single `VehicleAgent` against hand-built `SceneView`s so
//! every input to the decision is controlled.

use crosswalk_sim::simulation::{
    ConfigError, Obstacle, ObstacleId, Position, Route, SceneView, SignalId, SignalPhase,
    SignalSnapshot, SimId, StopCause, VehicleAgent, VehicleConfig, VehicleId, VehicleSnapshot,
    VehicleState, ALL_LAYERS, VEHICLE_RADIUS,
};

const SELF_ID: VehicleId = VehicleId(SimId(0));
const LEADER_ID: VehicleId = VehicleId(SimId(1));
const SIGNAL_ID: SignalId = SignalId(SimId(2));

fn straight_ahead() -> Route {
    Route::one_way(vec![Position::new(0.0, 0.0, 1000.0)])
}

fn agent(config: VehicleConfig) -> VehicleAgent {
    VehicleAgent::new(SELF_ID, Position::ZERO, straight_ahead(), config).expect("valid config")
}

fn signal_at(position: Position, phase: SignalPhase) -> SignalSnapshot {
    SignalSnapshot {
        id: SIGNAL_ID,
        position,
        phase,
    }
}

fn leader_at(z: f32, speed: f32) -> VehicleSnapshot {
    VehicleSnapshot {
        id: LEADER_ID,
        position: Position::new(0.0, 0.0, z),
        forward: Position::FORWARD,
        speed,
        radius: VEHICLE_RADIUS,
    }
}

fn obstacle_at(z: f32) -> Obstacle {
    Obstacle {
        id: ObstacleId(SimId(3)),
        center: Position::new(0.0, 0.0, z),
        radius: 0.5,
        layer: ALL_LAYERS,
    }
}

#[test]
fn test_red_light_within_stopping_distance() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene = SceneView::new().with_signal(signal_at(Position::new(0.0, 0.0, 4.0), SignalPhase::Stop));

    vehicle.update(0.1, &scene);

    assert_eq!(vehicle.nearest_signal(), Some(SIGNAL_ID));
    assert_eq!(vehicle.current_state(), VehicleState::StoppedAtLight);
    assert_eq!(vehicle.stop_cause(), StopCause::TrafficLight);
    assert_eq!(vehicle.target_speed(), 0.0);
    assert!(vehicle.is_stopped());
}

#[test]
fn test_warning_also_halts_vehicles() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene =
        SceneView::new().with_signal(signal_at(Position::new(0.0, 0.0, 4.0), SignalPhase::Warning));

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.current_state(), VehicleState::StoppedAtLight);
}

#[test]
fn test_green_light_lets_vehicle_through() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene = SceneView::new().with_signal(signal_at(Position::new(0.0, 0.0, 4.0), SignalPhase::Go));

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
    assert_eq!(vehicle.target_speed(), 5.0);
}

#[test]
fn test_red_light_beyond_stopping_distance_ignored() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene = SceneView::new().with_signal(signal_at(Position::new(0.0, 0.0, 8.0), SignalPhase::Stop));

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.nearest_signal(), Some(SIGNAL_ID));
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
}

#[test]
fn test_light_behind_is_not_tracked() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene =
        SceneView::new().with_signal(signal_at(Position::new(0.0, 0.0, -3.0), SignalPhase::Stop));

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.nearest_signal(), None);
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
}

#[test]
fn test_light_in_detection_cone_but_not_ahead() {
    // 65 degrees off the heading: dot ~= 0.42, inside the 0.3 detection cone
    // but outside the 0.5 stopping cone
    let angle = 65.0_f32.to_radians();
    let position = Position::new(4.0 * angle.sin(), 0.0, 4.0 * angle.cos());
    let mut vehicle = agent(VehicleConfig::default());
    let scene = SceneView::new().with_signal(signal_at(position, SignalPhase::Stop));

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.nearest_signal(), Some(SIGNAL_ID));
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
}

#[test]
fn test_nearest_of_several_signals_is_tracked() {
    let far = SignalSnapshot {
        id: SignalId(SimId(10)),
        position: Position::new(0.0, 0.0, 4.5),
        phase: SignalPhase::Go,
    };
    let near = SignalSnapshot {
        id: SignalId(SimId(11)),
        position: Position::new(0.5, 0.0, 3.0),
        phase: SignalPhase::Stop,
    };
    let behind = SignalSnapshot {
        id: SignalId(SimId(12)),
        position: Position::new(0.0, 0.0, -1.0),
        phase: SignalPhase::Go,
    };
    let scene = SceneView::new()
        .with_signal(far)
        .with_signal(near)
        .with_signal(behind);
    let mut vehicle = agent(VehicleConfig::default());

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.nearest_signal(), Some(near.id));
    assert_eq!(vehicle.current_state(), VehicleState::StoppedAtLight);
}

#[test]
fn test_light_takes_priority_over_leader() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene = SceneView::new()
        .with_signal(signal_at(Position::new(0.0, 0.0, 4.0), SignalPhase::Stop))
        .with_vehicle(leader_at(3.0, 0.0));

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.leader(), Some(LEADER_ID));
    assert_eq!(vehicle.current_state(), VehicleState::StoppedAtLight);
    assert_eq!(vehicle.stop_cause(), StopCause::TrafficLight);
}

#[test]
fn test_leader_within_follow_distance_stops_vehicle() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene = SceneView::new().with_vehicle(leader_at(3.5, 2.0));

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.current_state(), VehicleState::StoppedForVehicle);
    assert_eq!(vehicle.target_speed(), 0.0);
}

#[test]
fn test_leader_takes_priority_over_obstacle() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene = SceneView::new()
        .with_vehicle(leader_at(3.0, 0.0))
        .with_obstacle(obstacle_at(4.5));

    vehicle.update(0.1, &scene);
    assert_eq!(vehicle.current_state(), VehicleState::StoppedForVehicle);
}

#[test]
fn test_convoy_damping_caps_target_speed() {
    // Leader at 6 units: outside follow distance (4), inside the band (8)
    let mut vehicle = agent(VehicleConfig::default());
    vehicle.update(0.1, &SceneView::new().with_vehicle(leader_at(6.0, 4.5)));
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
    assert!((vehicle.target_speed() - 3.5).abs() < 1e-5);

    let mut vehicle = agent(VehicleConfig::default());
    vehicle.update(0.1, &SceneView::new().with_vehicle(leader_at(6.0, 2.0)));
    assert!((vehicle.target_speed() - 2.0).abs() < 1e-5);

    let fast = VehicleConfig {
        normal_speed: 50.0,
        ..VehicleConfig::default()
    };
    let mut vehicle = agent(fast);
    vehicle.update(0.1, &SceneView::new().with_vehicle(leader_at(6.0, 40.0)));
    assert!((vehicle.target_speed() - 35.0).abs() < 1e-4);
    assert!(vehicle.target_speed() <= 0.7 * 50.0 + 1e-4);
}

#[test]
fn test_leader_outside_band_ignored_for_speed() {
    let mut vehicle = agent(VehicleConfig::default());
    vehicle.update(0.1, &SceneView::new().with_vehicle(leader_at(9.0, 1.0)));

    assert_eq!(vehicle.leader(), Some(LEADER_ID));
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
    assert_eq!(vehicle.target_speed(), 5.0);
}

#[test]
fn test_leader_in_other_lane_not_detected() {
    let mut vehicle = agent(VehicleConfig::default());
    let mut other = leader_at(3.0, 0.0);
    other.position.x = 4.0;

    vehicle.update(0.1, &SceneView::new().with_vehicle(other));
    assert_eq!(vehicle.leader(), None);
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
}

#[test]
fn test_obstacle_within_stopping_distance() {
    let mut vehicle = agent(VehicleConfig::default());
    vehicle.update(0.1, &SceneView::new().with_obstacle(obstacle_at(4.0)));
    assert_eq!(vehicle.current_state(), VehicleState::StoppedForObstacle);
    assert_eq!(vehicle.stop_cause(), StopCause::Obstacle);

    let mut vehicle = agent(VehicleConfig::default());
    vehicle.update(0.1, &SceneView::new().with_obstacle(obstacle_at(9.0)));
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
}

#[test]
fn test_free_road_accelerates_to_normal_speed() {
    let mut vehicle = agent(VehicleConfig::default());
    let scene = SceneView::new();

    let mut previous = vehicle.current_speed();
    let mut speeds = Vec::new();
    for _ in 0..8 {
        vehicle.update(0.5, &scene);
        assert_eq!(vehicle.target_speed(), 5.0);
        assert!(vehicle.current_speed() >= previous);
        assert!(vehicle.current_speed() <= 5.0);
        previous = vehicle.current_speed();
        speeds.push(previous);
    }

    assert_eq!(&speeds[..5], &[1.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(speeds[7], 5.0);
    assert!(!vehicle.is_stopped());
}

#[test]
fn test_braking_uses_deceleration_rate() {
    let mut vehicle = agent(VehicleConfig::default()).with_speed(5.0);
    let scene = SceneView::new().with_signal(signal_at(Position::new(0.0, 0.0, 4.0), SignalPhase::Stop));

    vehicle.update(0.1, &scene);
    assert!((vehicle.current_speed() - 4.5).abs() < 1e-5);

    for _ in 0..20 {
        vehicle.update(0.1, &scene);
        assert!(vehicle.current_speed() >= 0.0);
    }
    assert_eq!(vehicle.current_speed(), 0.0);
    assert!(vehicle.is_stopped());
}

#[test]
fn test_speed_stays_in_bounds() {
    let mut vehicle = agent(VehicleConfig::default());
    let phases = [SignalPhase::Go, SignalPhase::Stop, SignalPhase::Warning];

    for step in 0..400 {
        let phase = phases[(step / 25) % phases.len()];
        let signal_z = vehicle.position.z + 4.0;
        let scene = SceneView::new()
            .with_signal(signal_at(Position::new(0.0, 0.0, signal_z), phase))
            .with_vehicle(leader_at(vehicle.position.z + 6.0, 9.0));
        vehicle.update(0.05, &scene);

        let speed = vehicle.current_speed();
        assert!((0.0..=5.0).contains(&speed), "speed {} out of bounds", speed);
    }
}

#[test]
fn test_waypoints_loop_forever() {
    let a = Position::new(0.0, 0.0, 0.0);
    let b = Position::new(0.0, 0.0, 10.0);
    let mut vehicle =
        VehicleAgent::new(SELF_ID, a, Route::looping(vec![a, b]), VehicleConfig::default())
            .expect("valid config");

    let scene = SceneView::new();
    let mut reached = Vec::new();
    for _ in 0..800 {
        let update = vehicle.update(0.1, &scene);
        assert!(!update.route_completed);
        if let Some(index) = update.reached_waypoint {
            reached.push(index);
        }
    }

    assert!(reached.len() >= 6, "only reached {:?}", reached);
    for (i, index) in reached.iter().enumerate() {
        assert_eq!(*index, i % 2, "unexpected order {:?}", reached);
    }
    assert!(!vehicle.route_complete());
}

#[test]
fn test_one_way_route_halts_at_last_waypoint() {
    let a = Position::new(0.0, 0.0, 0.0);
    let b = Position::new(0.0, 0.0, 10.0);
    let mut vehicle =
        VehicleAgent::new(SELF_ID, a, Route::one_way(vec![a, b]), VehicleConfig::default())
            .expect("valid config");

    let scene = SceneView::new();
    let mut reached = Vec::new();
    let mut completions = 0;
    for _ in 0..400 {
        let update = vehicle.update(0.1, &scene);
        reached.extend(update.reached_waypoint);
        if update.route_completed {
            completions += 1;
        }
    }

    assert_eq!(reached, vec![0, 1]);
    assert_eq!(completions, 1);
    assert!(vehicle.route_complete());
    assert_eq!(vehicle.current_waypoint(), Some(1));
    assert!(vehicle.position.distance(&b) < 0.5);
    assert_eq!(vehicle.target_speed(), 0.0);
    assert!(vehicle.is_stopped());
}

#[test]
fn test_empty_route_is_not_an_error() {
    let mut vehicle = VehicleAgent::new(
        SELF_ID,
        Position::ZERO,
        Route::default(),
        VehicleConfig::default(),
    )
    .expect("valid config");

    for _ in 0..20 {
        vehicle.update(0.1, &SceneView::new());
    }
    assert_eq!(vehicle.current_waypoint(), None);
    assert_eq!(vehicle.position, Position::ZERO);
    assert_eq!(vehicle.current_speed(), 0.0);
}

#[test]
fn test_emergency_stop_overrides_state_machine() {
    let mut vehicle = agent(VehicleConfig::default()).with_speed(5.0);
    let scene = SceneView::new();

    vehicle.emergency_stop();
    assert!(vehicle.is_emergency_stopped());
    assert_eq!(vehicle.current_speed(), 0.0);

    let parked = vehicle.position;
    for _ in 0..20 {
        vehicle.update(0.1, &scene);
        assert_eq!(vehicle.current_speed(), 0.0);
        assert_eq!(vehicle.target_speed(), 0.0);
    }
    assert_eq!(vehicle.position, parked);
    assert_eq!(vehicle.current_state(), VehicleState::Driving);

    vehicle.resume_movement();
    assert!(!vehicle.is_emergency_stopped());
    vehicle.update(0.5, &scene);
    assert!((vehicle.current_speed() - 1.0).abs() < 1e-5);
    assert!(vehicle.position.z > parked.z);
}

#[test]
fn test_stale_references_resolve_to_absent() {
    let mut vehicle = agent(VehicleConfig::default());
    let crowded = SceneView::new()
        .with_signal(signal_at(Position::new(0.0, 0.0, 4.0), SignalPhase::Stop))
        .with_vehicle(leader_at(3.0, 0.0));
    vehicle.update(0.1, &crowded);
    assert_eq!(vehicle.current_state(), VehicleState::StoppedAtLight);

    // Both the signal and the leader have been despawned
    vehicle.update(0.1, &SceneView::new());
    assert_eq!(vehicle.nearest_signal(), None);
    assert_eq!(vehicle.leader(), None);
    assert_eq!(vehicle.current_state(), VehicleState::Driving);
}

#[test]
fn test_non_finite_delta_leaves_vehicle_untouched() {
    let mut vehicle = agent(VehicleConfig::default()).with_speed(3.0);
    let scene = SceneView::new();

    for delta in [f32::NAN, f32::INFINITY, -0.1] {
        let result = vehicle.update(delta, &scene);
        assert_eq!(result.state_change, None);
        assert_eq!(vehicle.current_speed(), 3.0);
        assert_eq!(vehicle.position, Position::ZERO);
    }
}

#[test]
fn test_signal_scan_is_throttled() {
    let mut vehicle = agent(VehicleConfig::default());
    let with_signal =
        SceneView::new().with_signal(signal_at(Position::new(0.0, 0.0, 4.0), SignalPhase::Stop));

    // First update scans immediately and finds nothing
    vehicle.update(0.25, &SceneView::new());
    assert_eq!(vehicle.nearest_signal(), None);

    // Signal appears, but the next scan is not due yet
    vehicle.update(0.25, &with_signal);
    assert_eq!(vehicle.nearest_signal(), None);

    vehicle.update(0.25, &with_signal);
    assert_eq!(vehicle.nearest_signal(), Some(SIGNAL_ID));
}

#[test]
fn test_invalid_vehicle_config_rejected() {
    let config = VehicleConfig {
        normal_speed: 0.0,
        ..VehicleConfig::default()
    };
    let err = VehicleAgent::new(SELF_ID, Position::ZERO, straight_ahead(), config).unwrap_err();
    assert_eq!(
        err,
        ConfigError::NonPositiveSpeed {
            field: "normal_speed",
            value: 0.0
        }
    );

    let config = VehicleConfig {
        signal_ahead_cone: 1.5,
        ..VehicleConfig::default()
    };
    assert!(config.validate().is_err());

    let config = VehicleConfig {
        follow_distance: -1.0,
        ..VehicleConfig::default()
    };
    assert!(config.validate().is_err());
}
