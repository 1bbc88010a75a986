//! Binary entrypoint for the VJ display.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

/// Simple CLI
#[derive(Debug, Parser)]
#[command(name = "vj-frame", about = "Fullscreen VJ display with keystone warp")]
struct Cli {
    /// Path to YAML config file
    #[arg(short, long, value_name = "FILE", default_value = "config.yaml")]
    config: PathBuf,

    /// Override the media folder
    #[arg(long, value_name = "DIR")]
    media_dir: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    // map -v to log level
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("vj_frame={}", level).parse().unwrap())
        .add_directive("wgpu=warn".parse().unwrap())
        .add_directive("winit=warn".parse().unwrap());
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut cfg = if cli.config.exists() {
        vj_frame::config::from_yaml_file(&cli.config)
            .with_context(|| format!("loading config from {}", cli.config.display()))?
    } else {
        info!(config = %cli.config.display(), "config file missing; using defaults");
        vj_frame::config::Configuration::default()
    };
    if let Some(dir) = cli.media_dir {
        cfg.media_dir = dir;
    }
    cfg.validate().context("validating configuration")?;

    info!(media_dir = %cfg.media_dir.display(), "starting display");
    vj_frame::render::viewer::run_display(cfg)?;
    Ok(())
}
