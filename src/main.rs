//! domewarp - warp mesh calibration for mirror-projected dome displays
//!
//! Traces the projector's frustum off a mirror onto the dome, matches the dome
//! hits against a canonical ring/segment parameterization of the dome, and
//! writes the normalized correspondence for a downstream warping renderer.

mod calibration;
mod config;
mod correspondence;
mod dome;
mod error;
mod geometry;
mod normalize;
mod output;
mod projector;
mod sampler;
mod scene;
mod tracer;

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::SamplingMode;

/// domewarp - dome projection warp mesh calibration
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (created with defaults if missing)
    #[arg(short, long, default_value = "calibration.toml")]
    config: PathBuf,

    /// Directory for the generated files
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Sampling pattern: rect or radial
    #[arg(short, long)]
    mode: Option<SamplingMode>,

    /// Samples per row (rect mode)
    #[arg(long)]
    sample_x: Option<usize>,

    /// Samples per column (rect mode)
    #[arg(long)]
    sample_y: Option<usize>,

    /// Skip mask.txt and screen_to_dome.txt
    #[arg(long)]
    no_legacy: bool,

    /// Also write report.json
    #[arg(long)]
    report: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // RUST_LOG wins over --verbose when set
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.as_str().to_ascii_lowercase()));
    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    info!("domewarp v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::Config::load_or_create(&args.config)?;

    // CLI values override the file
    if let Some(dir) = args.output_dir {
        config.output.directory = dir;
    }
    if let Some(mode) = args.mode {
        config.sampling.mode = mode;
    }
    if let Some(x) = args.sample_x {
        config.sampling.sample_x = x;
    }
    if let Some(y) = args.sample_y {
        config.sampling.sample_y = y;
    }
    if args.no_legacy {
        config.output.legacy = false;
    }
    if args.report {
        config.output.report = true;
    }

    config.validate()?;

    info!(
        "Projector at {:?} cm, mirror {}, dome diameter {} cm",
        config.projector.position_cm.as_slice(),
        if config.mirror.enabled { "enabled" } else { "disabled" },
        config.dome.diameter_cm
    );
    info!("Output directory: {:?}", config.output.directory);

    let report = calibration::run(&config)?;
    for file in &report.files {
        info!("  {}", file.display());
    }

    Ok(())
}
