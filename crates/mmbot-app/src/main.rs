//! mmbot entry point.

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use mmbot_app::{spawn_signal_listener, AppConfig, TradingLoop};
use mmbot_exchange::{BinanceSpotClient, DynExchangeClient};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Single-symbol market maker for Binance spot.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via MMBOT_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    mmbot_telemetry::init_logging()?;

    info!("Starting mmbot v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > MMBOT_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("MMBOT_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = AppConfig::from_file(&config_path)?;
    info!(
        symbol = %config.strategy.symbol,
        base_url = %config.exchange.base_url,
        "Configuration loaded"
    );

    let credentials = config.exchange.load_credentials()?;
    let client: DynExchangeClient = Arc::new(BinanceSpotClient::new(
        config.exchange.binance_config(),
        credentials,
    )?);

    let token = CancellationToken::new();
    let listener = spawn_signal_listener(token.clone());

    let mut trading_loop = TradingLoop::new(config.strategy, client);
    let result = trading_loop.run(token.clone()).await;

    token.cancel();
    let _ = listener.await;

    result?;
    info!("Shutdown complete");
    Ok(())
}
