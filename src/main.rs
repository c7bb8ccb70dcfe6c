//! Main entry point for the market-data-collector CLI

use clap::Parser;
use market_data_collector::cli::{Cli, CliError};
use market_data_collector::collector::{Collector, RunStats};
use market_data_collector::fetcher::binance_http::BinanceHttpClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber with optional JSON formatting
fn init_tracing() {
    // Check if JSON output is requested via environment variable
    let json_format = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("market_data_collector=info"));

    if json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn run(cli: Cli) -> Result<RunStats, CliError> {
    if let Some(addr) = cli.metrics_addr {
        market_data_collector::metrics::init_metrics(addr)?;
    }

    let config = cli.into_config()?;
    let client = BinanceHttpClient::from_config(&config)?;
    info!(
        base_url = client.base_url(),
        max_retries = client.max_retries(),
        "HTTP client ready"
    );

    Ok(Collector::new(client, config).run().await)
}

#[tokio::main]
async fn main() {
    init_tracing();

    let cli = Cli::parse();

    let result = run(cli).await.map_err(|e| anyhow::anyhow!(e));

    match result {
        Ok(stats) => {
            if !stats.is_success() {
                error!(skipped = stats.skipped, "No dataset was persisted");
            }
            std::process::exit(stats.exit_code());
        }
        Err(e) => {
            error!("Collection failed: {}", e);
            std::process::exit(1);
        }
    }
}
