// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Roofslope CLI - slope a roof scene and route its corners to drains.
//!
//! ```text
//! roofslope scene.json --strategy astar --batch 100 --output report.json
//! ```
//!
//! Environment variables (`ROOFSLOPE_STRATEGY`, `ROOFSLOPE_BATCH_SIZE`,
//! `ROOFSLOPE_SLOPE_PERCENT`, `ROOFSLOPE_DISTANCE_THRESHOLD`,
//! `ROOFSLOPE_MAX_EDGE`, `ROOFSLOPE_LOG_JSON`, `ROOFSLOPE_PRETTY`) override
//! the scene's config block; flags override both. Logs go to stderr.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use roofslope_engine::Strategy;

mod config;
mod error;
mod scene;

use config::Config;
use error::CliError;
use scene::{run_scene, Scene};

#[derive(Parser)]
#[command(name = "roofslope")]
#[command(about = "Assign drainage slopes to a roof scene and route its corners")]
struct Cli {
    /// Scene JSON file
    scene: PathBuf,

    /// Corner routing strategy: dijkstra, astar or greedy
    #[arg(long)]
    strategy: Option<Strategy>,

    /// Elevation updates per batch (0 = one batch)
    #[arg(long)]
    batch: Option<usize>,

    /// Grade in percent
    #[arg(long)]
    slope: Option<f64>,

    /// Write the report here instead of stdout
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Pretty-print the report
    #[arg(long)]
    pretty: bool,
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(strategy) = self.strategy {
            config.strategy = strategy;
        }
        if let Some(batch) = self.batch {
            config.batch_size = batch;
        }
        if self.slope.is_some() {
            config.slope_percent = self.slope;
        }
        config.pretty |= self.pretty;
    }
}

fn init_logging(json: bool) {
    let filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,roofslope_engine=debug".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::from_env();
    cli.apply(&mut config);
    init_logging(config.log_json);

    tracing::info!(
        scene = %cli.scene.display(),
        strategy = %config.strategy,
        batch_size = config.batch_size,
        "Starting roofslope run"
    );

    let scene = Scene::load(&cli.scene)?;
    let report = run_scene(&scene, &config)?;

    tracing::info!(
        drains = report.drains.len(),
        processed = report.metrics.processed,
        skipped = report.metrics.skipped,
        routed = report.routing.succeeded,
        total_time_ms = report.metrics.total_time_ms,
        "Run complete"
    );

    let body = if config.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };

    match &cli.output {
        Some(path) => std::fs::write(path, body).map_err(|source| CliError::Write {
            path: path.clone(),
            source,
        })?,
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{body}")?;
        }
    }
    Ok(())
}
