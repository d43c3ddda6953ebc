//! Simulated robot driven by the Cadence command scheduler.
//!
//! Runs a scripted match (disabled, autonomous, teleop) either stepped as
//! fast as possible or against the wall clock.

mod autos;
mod controller;
mod robot;
mod subsystems;

use anyhow::Context;
use autos::Auto;
use cadence::prelude::{ControlLoop, Scheduler, SchedulerConfig};
use clap::Parser;
use colored::*;
use controller::ScriptedDriver;
use robot::Robot;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cadence_robot")]
#[command(about = "Simulated robot driven by the Cadence command scheduler")]
#[command(version)]
struct Cli {
    /// Scheduler configuration file (.toml, .yaml or .yml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of scheduler cycles to run (defaults to the whole script)
    #[arg(short = 'n', long = "cycles")]
    cycles: Option<u64>,

    /// Autonomous routine to run
    #[arg(short = 'a', long = "auto", value_enum, default_value_t = Auto::ShootAndTaxi)]
    auto: Auto,

    /// Pace cycles against the wall clock instead of stepping
    #[arg(short = 'r', long = "realtime")]
    realtime: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SchedulerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SchedulerConfig::standard(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut scheduler = Scheduler::new();
    let robot = Robot::new(&mut scheduler, cli.auto).context("configuring robot")?;
    let mut control = ControlLoop::new(scheduler, config).context("starting control loop")?;

    let script = ScriptedDriver::default();
    let cycles = cli.cycles.unwrap_or(script.length() + 10);
    robot.install(&mut control, script)?;

    println!(
        "{} {} ({} cycles, auto {:?}, {})",
        "Starting".green().bold(),
        control.scheduler().name(),
        cycles,
        cli.auto,
        if cli.realtime { "realtime" } else { "stepped" }
    );

    let started = Instant::now();
    if cli.realtime {
        let period = control.scheduler().period();
        control.run_for(period * cycles.min(u32::MAX as u64) as u32)?;
    } else {
        control.run_cycles(cycles);
    }
    let elapsed = started.elapsed();

    let scheduler = control.scheduler();
    println!("\n{}", "Match summary".cyan().bold());
    println!("  cycles:    {}", scheduler.cycle());
    println!("  wall time: {:.1?}", elapsed);
    println!("  shots:     {}", robot.shots());
    println!("  distance:  {:.2} m", robot.drive.distance());
    println!("  stored:    {}", robot.hopper.stored());
    println!("  flywheel:  {:.0} rpm", robot.shooter.rpm());
    if let Some(stats) = scheduler.stats(robot.autonomous_command()) {
        println!(
            "  auto:      {:?} ran {} time(s), {} interrupted",
            robot.chooser.selected(),
            stats.initialized,
            stats.interrupted
        );
    }

    let faults = scheduler.fault_log().total();
    if faults.is_empty() {
        println!("  faults:    {}", "none".green());
    } else {
        println!("  faults:");
        for (fault, record) in &faults {
            println!(
                "    {} [{}] {} x{}",
                fault.source.yellow(),
                fault.severity.as_str(),
                fault.description,
                record.count
            );
        }
    }
    Ok(())
}
