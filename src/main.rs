//! Revert - Mean-Reversion Research Engine
//!
//! Command-line entry point.

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use revert_engine::adapters::cli::{self, CliApp, Session};
use revert_engine::adapters::JsonSeriesStore;
use revert_engine::config::load_config;
use revert_engine::strategy::StrategyConfig;

const DEFAULT_DATA_DIR: &str = "data";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (REVERT_DATA_DIR, RUST_LOG)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();

    let config = match &app.config {
        Some(path) => Some(
            load_config(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        ),
        None => None,
    };

    let default_level = config.as_ref().map(|c| c.logging.level.as_str()).unwrap_or("warn");
    init_logging(app.verbose, app.debug, default_level)?;

    let strategy = match &config {
        Some(config) => StrategyConfig::from(config),
        None => StrategyConfig::default(),
    };
    let data_dir = app
        .data_dir
        .clone()
        .or_else(|| config.as_ref().map(|c| c.data.get_dir()))
        .or_else(|| std::env::var("REVERT_DATA_DIR").ok())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    tracing::info!("Data directory: {}", data_dir);

    let session = Session {
        strategy,
        store: Arc::new(JsonSeriesStore::new(data_dir)),
        format: app.format,
    };

    cli::execute(app.command, session).await
}

fn init_logging(verbose: bool, debug: bool, default_level: &str) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    // logs go to stderr so --format json output stays parseable
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}
