//! Command-line front end: build the wall described by a profile file and
//! answer ice-amount and cost queries about the run as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use masonry::{BuildMode, CostReport, Reporter, SimulationConfig, StdoutReporter, simulate};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// CLI entry point wrapper.
#[derive(Parser, Debug)]
#[command(name = "masonry", version, about)]
struct Args {
    /// JSON configuration file. Flags below override its values.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Wall profile file, one profile per line.
    #[arg(long, global = true)]
    input: Option<PathBuf>,

    /// Height every section is built up to.
    #[arg(long, global = true)]
    target_height: Option<u32>,

    /// Number of build workers (concurrent mode only).
    #[arg(long, global = true)]
    workers: Option<usize>,

    #[arg(long, value_enum, global = true)]
    mode: Option<Mode>,

    /// Longest a single day may take before the run is declared stalled.
    #[arg(long, global = true)]
    round_timeout: Option<humantime::Duration>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum Mode {
    Serial,
    Concurrent,
}

impl From<Mode> for BuildMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Serial => BuildMode::Serial,
            Mode::Concurrent => BuildMode::Concurrent,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ice used by one profile on one day.
    Amount {
        #[arg(long)]
        profile: u32,
        #[arg(long)]
        day: u32,
    },
    /// Cost of one day, for one profile or the whole wall.
    Price {
        #[arg(long)]
        day: u32,
        #[arg(long)]
        profile: Option<u32>,
    },
    /// Cost of the whole wall.
    Overall,
    /// Full cost report.
    Report,
}

impl Args {
    fn config(&self) -> anyhow::Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => SimulationConfig::from_path(path)?,
            None => SimulationConfig::default(),
        };
        if let Some(input) = &self.input {
            config.input = input.clone();
        }
        if let Some(target_height) = self.target_height {
            config.target_height = target_height;
        }
        if let Some(workers) = self.workers {
            config.workers = workers;
        }
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(timeout) = self.round_timeout {
            let timeout: std::time::Duration = timeout.into();
            config.round_timeout_ms =
                u64::try_from(timeout.as_millis()).context("round timeout is too large")?;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the JSON answer; logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("masonry=info,warn")),
        )
        .init();

    let args = Args::parse();
    let config = args.config()?;
    let history = simulate(&config)
        .await
        .with_context(|| format!("building wall from '{}'", config.input.display()))?;

    let answer = match args.cmd {
        Command::Amount { profile, day } => json!({
            "day": day,
            "ice_amount": history.amount_per_profile_per_day(profile, day),
        }),
        Command::Price {
            day,
            profile: Some(profile),
        } => json!({
            "day": day,
            "cost": history.price_per_profile_per_day(profile, day),
        }),
        Command::Price { day, profile: None } => json!({
            "day": day,
            "cost": history.price_per_day(day),
        }),
        Command::Overall => json!({
            "day": null,
            "cost": history.overall(),
        }),
        Command::Report => {
            StdoutReporter.report(&CostReport::from(history)).await?;
            return Ok(());
        }
    };
    println!("{answer}");
    Ok(())
}
