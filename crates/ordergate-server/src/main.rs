//! ordergate — reference trading control core.
//!
//! Accepts authenticated order submissions, gates them through
//! pre-trade risk, executes approved orders asynchronously with
//! resilience patterns, and records a replayable audit journal.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use ordergate_server::{AppConfig, Application};

/// ordergate trading control core
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (also settable via ORDERGATE_CONFIG)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    ordergate_telemetry::init_logging()?;

    info!("starting ordergate v{}", env!("CARGO_PKG_VERSION"));

    let config = AppConfig::load(args.config.as_deref())?;
    info!(listen_addr = %config.listen_addr, "configuration loaded");

    Application::build(config).serve().await?;

    Ok(())
}
