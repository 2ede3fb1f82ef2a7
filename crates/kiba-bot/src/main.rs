//! kiba - Entry Point
//!
//! `kiba <PAIR> <SOURCE>...` tracks the pair on every listed exchange and
//! prints the cross-source moving average every second.

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Cross-exchange moving-average price tracker
#[derive(Parser, Debug)]
#[command(name = "kiba", version, about, long_about = None)]
struct Args {
    /// Trading pair, e.g. ETH/BTC or ETHBTC
    pair: Option<String>,

    /// Exchanges to read from (binance, bitfinex)
    sources: Vec<String>,

    /// Configuration file path (can also be set via KIBA_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    kiba_ws::init_crypto();

    let args = Args::parse();

    let Some(pair) = args.pair.filter(|p| !p.trim().is_empty()) else {
        println!("{}", kiba_bot::INVALID_COMMAND);
        return Ok(());
    };
    if args.sources.is_empty() {
        println!("{}", kiba_bot::INVALID_COMMAND);
        return Ok(());
    }

    let config = kiba_bot::AppConfig::load(args.config.as_deref())?;

    kiba_telemetry::init_logging(&config.telemetry.log_level)?;

    info!("Starting kiba v{}", env!("CARGO_PKG_VERSION"));

    let app = kiba_bot::Application::new(config);
    app.run(&pair, &args.sources).await?;

    Ok(())
}
