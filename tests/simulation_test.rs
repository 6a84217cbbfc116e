use std::process::Command;

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_crosswalk_sim"))
        .args(args)
        .env("RUST_LOG", "warn,crosswalk_sim=info")
        .output()
        .expect("Failed to execute simulation")
}

/// Test that the simulation runs in headless mode without crashing
#[test]
fn test_headless_simulation_runs() {
    let output = run_cli(&["--ticks", "200", "--delta", "0.1", "--seed", "7"]);

    assert!(
        output.status.success(),
        "Simulation failed to run in headless mode. stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("SIMULATION COMPLETE"),
        "Simulation did not complete properly. stdout: {}",
        stdout
    );
    assert!(stdout.contains("Total signals: 2"));
    assert!(stdout.contains("Total vehicles: 4"));
}

/// Test that phase changes are logged while the simulation runs
#[test]
fn test_phase_changes_logged() {
    let output = run_cli(&[
        "--ticks",
        "100",
        "--delta",
        "0.1",
        "--stop-duration",
        "2",
        "--go-duration",
        "2",
        "--warning-duration",
        "1",
    ]);
    assert!(output.status.success(), "Simulation failed to run");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("now Go"), "Missing Go transition. stderr: {}", stderr);
    assert!(stderr.contains("now Warning"), "Missing Warning transition");
}

/// Test that the map is drawn when requested
#[test]
fn test_map_output() {
    let output = run_cli(&["--ticks", "10", "--seed", "1", "--map"]);
    assert!(output.status.success(), "Simulation failed to run");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("=== World Map ==="));
}

/// Test that bad configuration is rejected before the run starts
#[test]
fn test_invalid_configuration_rejected() {
    let output = run_cli(&["--stop-duration", "0"]);
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("duration must be positive"),
        "Unexpected error output: {}",
        stderr
    );

    let output = run_cli(&["--normal-speed", "-1"]);
    assert!(!output.status.success());
}
