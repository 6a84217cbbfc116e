use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use crosswalk_sim::simulation::{LogSink, SignalTimings, SimConfig, SimWorld, VehicleConfig};

#[derive(Parser)]
#[command(name = "crosswalk_sim")]
#[command(about = "Headless traffic core of the crosswalk safety trainer")]
struct Cli {
    /// Number of simulation ticks to run
    #[arg(long, default_value = "1000")]
    ticks: u32,

    /// Time delta per tick in seconds
    #[arg(long, default_value = "0.1")]
    delta: f32,

    /// Seed for reproducible vehicle placement
    #[arg(long)]
    seed: Option<u64>,

    /// Number of vehicles on the test road
    #[arg(long, default_value = "4")]
    vehicles: usize,

    /// Seconds the signal holds Stop
    #[arg(long, default_value = "30")]
    stop_duration: f32,

    /// Seconds the signal holds Go
    #[arg(long, default_value = "15")]
    go_duration: f32,

    /// Seconds the signal holds Warning
    #[arg(long, default_value = "5")]
    warning_duration: f32,

    /// Cruising speed of vehicles in units per second
    #[arg(long, default_value = "5")]
    normal_speed: f32,

    /// Simulated seconds between status reports
    #[arg(long, default_value = "10")]
    report_interval: f32,

    /// Draw an ASCII map with each report
    #[arg(long)]
    map: bool,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn,crosswalk_sim=info"),
    )
    .init();

    let cli = Cli::parse();
    if let Err(e) = run_headless(&cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

/// Run the simulation in headless mode (no graphics)
fn run_headless(cli: &Cli) -> Result<()> {
    if !(cli.delta > 0.0) {
        anyhow::bail!("--delta must be positive, got {}", cli.delta);
    }

    let config = SimConfig {
        signal: SignalTimings::new(cli.stop_duration, cli.go_duration, cli.warning_duration),
        vehicle: VehicleConfig {
            normal_speed: cli.normal_speed,
            ..VehicleConfig::default()
        },
    };
    let world = SimWorld::with_config(config, cli.seed).context("Failed to set up simulation")?;
    let mut world = SimWorld::build_test_world(world, cli.vehicles);
    world.add_sink(LogSink);

    println!("Running crosswalk simulation in headless mode...");
    println!("Ticks: {}, Delta: {}s", cli.ticks, cli.delta);
    println!();

    println!("Initial state:");
    report(&world, cli.map);

    let ticks_per_report = ((cli.report_interval / cli.delta).ceil() as u32).max(1);

    let mut tick = 0;
    while tick < cli.ticks {
        let ticks_to_run = ticks_per_report.min(cli.ticks - tick);
        for _ in 0..ticks_to_run {
            tick += 1;
            world.tick(cli.delta);
        }

        println!(
            "--- After tick {} ({:.1}s simulated time) ---",
            tick,
            tick as f32 * cli.delta
        );
        report(&world, cli.map);
    }

    let stopped = world.vehicles.values().filter(|v| v.is_stopped()).count();
    info!(
        "Finished after {:.1}s with {} vehicles ({} stopped)",
        world.time,
        world.vehicles.len(),
        stopped
    );

    println!("=== SIMULATION COMPLETE ===");
    println!("Total signals: {}", world.signals.len());
    println!("Total vehicles: {}", world.vehicles.len());
    Ok(())
}

fn report(world: &SimWorld, map: bool) {
    world.print_summary();
    if map {
        world.draw_map();
    }
    println!();
}
