//! # Dispatch Demo
//!
//! Runs the full scheduler with the simulated producers and unit of work:
//! producers for a fixed duration, a drain grace period, then phased
//! shutdown and a final report.

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;

use dispatch_core::config::ConfigManager;
use dispatch_core::logging::init_structured_logging;
use dispatch_core::orchestration::{Scheduler, SimulatedProducer, SimulatedWork};

#[derive(Parser)]
#[command(name = "dispatch-demo")]
#[command(about = "Run the priority task scheduler demo")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration directory (default: $DISPATCH_CONFIG_DIR or ./config)
    #[arg(short, long)]
    config_dir: Option<PathBuf>,

    /// Environment overlay to load (development, test, production)
    #[arg(short, long)]
    environment: Option<String>,

    /// Override scheduler.run_duration_ms
    #[arg(long)]
    run_duration_ms: Option<u64>,

    /// Override scheduler.worker_pool_size
    #[arg(short, long)]
    workers: Option<usize>,

    /// Print the resolved configuration as JSON and exit
    #[arg(long)]
    print_config: bool,
}

// Logging may not be installed yet when this fails, so report on stderr
fn main() {
    if let Err(e) = run(Cli::parse()) {
        eprintln!("{}", failure_message(&e));
        process::exit(1);
    }
}

fn failure_message(error: &anyhow::Error) -> String {
    format!("❌ {error:#}")
}

fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(dir) = &cli.config_dir {
        ConfigManager::require_directory(dir)?;
    }
    let environment = cli
        .environment
        .clone()
        .unwrap_or_else(ConfigManager::detect_environment);
    let manager = ConfigManager::load_from_directory_with_env(cli.config_dir.clone(), &environment)
        .context("failed to load configuration")?;

    let mut config = manager.config().clone();
    if let Some(run_duration_ms) = cli.run_duration_ms {
        config.scheduler.run_duration_ms = run_duration_ms;
    }
    if let Some(workers) = cli.workers {
        config.scheduler.worker_pool_size = workers;
    }

    if cli.print_config {
        let resolved = ConfigManager::from_config(config, manager.environment())?;
        println!("{}", serde_json::to_string_pretty(&resolved.debug_config())?);
        return Ok(());
    }

    init_structured_logging(&config.logging, manager.environment());
    info!(
        environment = %manager.environment(),
        config_dir = %manager.config_directory().display(),
        "Starting dispatch demo"
    );

    let producers = SimulatedProducer::from_configs(&config.producers);
    let executor = Arc::new(SimulatedWork::new(config.work.clone()));
    let mut scheduler = Scheduler::new(config, executor)?;
    let report = scheduler.run(producers)?;

    info!(
        terminal = report.terminal_count(),
        failed = report.failed.len(),
        abandoned = report.shutdown.abandoned_tasks,
        elapsed_ms = report.elapsed_ms,
        "Dispatch demo completed"
    );
    Ok(())
}
