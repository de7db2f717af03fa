use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use pursuit_sim_lib::{SimConfig, Simulation, run_duration};

#[derive(Parser)]
#[command(name = "pursuit-sim")]
#[command(version)]
#[command(about = "Hunter/target pursuit with kill-and-respawn on capture")]
struct Cli {
    /// JSON config file; built-in defaults when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated run time in seconds
    #[arg(long, default_value = "30")]
    duration_secs: f64,

    /// Random seed for respawn positions and fault injection
    #[arg(long)]
    seed: Option<u64>,

    /// Override faults.failure_rate
    #[arg(long)]
    failure_rate: Option<f64>,

    /// Override faults.unavailable_rate
    #[arg(long)]
    unavailable_rate: Option<f64>,

    /// Write the JSON report here instead of stdout
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .init();

    let duration = run_duration(cli.duration_secs).context("invalid --duration-secs")?;

    let mut config = match &cli.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    if let Some(rate) = cli.failure_rate {
        config.faults.failure_rate = rate;
    }
    if let Some(rate) = cli.unavailable_rate {
        config.faults.unavailable_rate = rate;
    }

    info!("pursuit controller has been started");
    let simulation = Simulation::new(config).context("setting up simulation")?;
    let report = simulation
        .run_for(duration)
        .await;

    let json = serde_json::to_string_pretty(&report)?;
    match cli.report {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
