//! # Chimera
//!
//! Runs one combat scenario headlessly.
//!
//! ```text
//! chimera [CONFIG]          run CONFIG (default: chimera.toml)
//! chimera --init [CONFIG]   write the default scenario to CONFIG
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(clippy::unwrap_used)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use chimera_gameplay::Bestiary;
use chimera_sim::{Scenario, SimConfig, CONFIG_FILE};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Main entry point.
fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let first = args.next();

    if first.as_deref() == Some("--init") {
        let path = args.next().map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
        SimConfig::default()
            .save_to(&path)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote default scenario to {}", path.display());
        return Ok(());
    }

    let path = first.map_or_else(|| PathBuf::from(CONFIG_FILE), PathBuf::from);
    let mut config = SimConfig::load_from(&path);
    config.validate();

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_filter)?,
    };
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    info!("Chimera starting...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let bestiary = match &config.bestiary_path {
        Some(bestiary_path) => Bestiary::load(bestiary_path)
            .with_context(|| format!("loading bestiary {}", bestiary_path.display()))?,
        None => Bestiary::builtin(),
    };
    for line in bestiary.summary() {
        info!("Blueprint {line}");
    }

    let mut scenario = Scenario::new(config, bestiary);
    let summary = scenario.run().clone();
    scenario.write_snapshot().context("writing snapshot")?;

    info!("{summary}");
    info!("Chimera shutdown complete");
    Ok(())
}
