//! Pincer spread-capture bot entry point.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Single-venue spread capture bot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PINCER_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    pincer_ws::init_crypto();

    let args = Args::parse();

    pincer_telemetry::init_logging()?;

    info!("Starting pincer v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > PINCER_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PINCER_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");

    let config = pincer_bot::AppConfig::from_file(&config_path)?;
    info!(mode = ?config.mode, ws_url = %config.ws_url, "Configuration loaded");

    let mut app = pincer_bot::Application::new(config);

    app.run_preflight().await?;

    app.run().await?;

    Ok(())
}
