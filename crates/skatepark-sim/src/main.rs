#![forbid(unsafe_code)]

//! # Skatepark Sim
//!
//! Headless runner for the skatepark physics: builds a premade track, drops
//! the skater on it and prints the skater's position and energy over time.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p skatepark-sim -- --track loop --duration 3 --format json
//! ```

mod cli;
mod run;

use std::io::{self, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use skatepark::PhysicsConfig;
use tracing_subscriber::EnvFilter;

use cli::{Cli, OutputFormat};
use run::Scenario;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    let base = match &cli.config {
        Some(path) => load_config(path)?,
        None => PhysicsConfig::default(),
    };
    let config = cli.apply(base);
    config.validate().context("invalid physics configuration")?;

    let scenario = Scenario {
        shape: cli.track.into(),
        duration: cli.duration,
        fps: cli.fps,
        sample_every: cli.sample_every,
        drop_point: cli.drop_point(),
    };
    let report = run::run(config, &scenario)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    match cli.format {
        OutputFormat::Text => run::write_text(&report, &mut out)?,
        OutputFormat::Json => run::write_json(&report, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

/// Logs go to stderr so they never mix with the report. `RUST_LOG` takes
/// precedence over `-v`.
fn init_logging(cli: &Cli) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false);
    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &Path) -> Result<PhysicsConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    PhysicsConfig::from_toml_str(&text)
        .with_context(|| format!("invalid config file {}", path.display()))
}
