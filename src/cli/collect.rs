//! Collection command line

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use super::CliError;
use crate::config::{CollectorConfig, RetryConfig, MAX_KLINE_LIMIT, MAX_STAT_LIMIT};
use crate::Interval;

/// Parse and validate a statistics period
fn parse_stat_period(s: &str) -> Result<Interval, String> {
    let interval: Interval = s.parse()?;
    if !interval.is_stat_period() {
        return Err(format!(
            "'{s}' is not a statistics period. Valid options: 5m, 15m, 30m, 1h, 2h, 4h, 6h, 12h, 1d"
        ));
    }
    Ok(interval)
}

/// Parse and validate a page size
fn parse_limit(s: &str) -> Result<usize, String> {
    let value: usize = s
        .parse()
        .map_err(|_| format!("'{s}' is not a valid number"))?;
    if value == 0 {
        return Err("limit must be at least 1".to_string());
    }
    Ok(value)
}

/// Binance USDS-M futures market data collector
#[derive(Parser, Debug)]
#[command(name = "market-data-collector")]
#[command(about = "Collect Binance USDS-M futures market data into CSV files", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Symbols to collect, comma separated
    #[arg(
        long,
        env = "COLLECTOR_SYMBOLS",
        value_delimiter = ',',
        default_value = "ARBUSDT,BTCUSDT,ETHUSDT"
    )]
    pub symbols: Vec<String>,

    /// Kline interval (also used for index/mark/premium klines)
    #[arg(long, env = "COLLECTOR_INTERVAL", default_value = "15m")]
    pub interval: Interval,

    /// Days of history to collect
    #[arg(long, env = "COLLECTOR_DAYS", default_value = "30", value_parser = clap::value_parser!(u32).range(1..))]
    pub days: u32,

    /// Output directory
    #[arg(long, env = "COLLECTOR_OUT_DIR", default_value = "data")]
    pub out_dir: PathBuf,

    /// Open interest statistics period
    #[arg(long, env = "COLLECTOR_OI_PERIOD", default_value = "1h", value_parser = parse_stat_period)]
    pub oi_period: Interval,

    /// Long/short ratio and taker volume statistics period
    #[arg(long, env = "COLLECTOR_RATIO_PERIOD", default_value = "1h", value_parser = parse_stat_period)]
    pub ratio_period: Interval,

    /// Rows per page for kline endpoints (max 1500)
    #[arg(long, env = "COLLECTOR_KLINE_LIMIT", default_value = "1500", value_parser = parse_limit)]
    pub kline_limit: usize,

    /// Rows per page for statistics and funding endpoints (max 500)
    #[arg(long, env = "COLLECTOR_STAT_LIMIT", default_value = "500", value_parser = parse_limit)]
    pub stat_limit: usize,

    /// Maximum number of retries for throttled or failed requests
    #[arg(long, env = "COLLECTOR_MAX_RETRIES", default_value = "5")]
    pub max_retries: u32,

    /// REST base URL
    #[arg(long, env = "COLLECTOR_BASE_URL", default_value = "https://fapi.binance.com")]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "COLLECTOR_TIMEOUT_SECS", default_value = "15", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout_secs: u64,

    /// Serve Prometheus metrics on this address (e.g., 127.0.0.1:9000)
    #[arg(long, env = "COLLECTOR_METRICS_ADDR")]
    pub metrics_addr: Option<SocketAddr>,
}

impl Cli {
    /// Validate arguments into a run configuration
    pub fn into_config(self) -> Result<CollectorConfig, CliError> {
        let symbols: Vec<String> = self
            .symbols
            .iter()
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(CliError::InvalidArgument(
                "at least one symbol is required".to_string(),
            ));
        }

        for (flag, period) in [("--oi-period", self.oi_period), ("--ratio-period", self.ratio_period)] {
            if !period.is_stat_period() {
                return Err(CliError::InvalidArgument(format!(
                    "{flag} {period} is not a statistics period"
                )));
            }
        }

        if self.days == 0 {
            return Err(CliError::InvalidArgument("--days must be at least 1".to_string()));
        }
        if self.kline_limit == 0 || self.stat_limit == 0 {
            return Err(CliError::InvalidArgument("limits must be at least 1".to_string()));
        }

        let base_url = self.base_url.trim().to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(CliError::ConfigurationError(format!(
                "--base-url must be an http(s) URL, got '{base_url}'"
            )));
        }

        Ok(CollectorConfig {
            base_url,
            symbols,
            interval: self.interval,
            lookback_days: self.days,
            out_dir: self.out_dir,
            oi_period: self.oi_period,
            ratio_period: self.ratio_period,
            kline_limit: self.kline_limit.min(MAX_KLINE_LIMIT),
            stat_limit: self.stat_limit.min(MAX_STAT_LIMIT),
            retry: RetryConfig {
                max_retries: self.max_retries,
                request_timeout: Duration::from_secs(self.timeout_secs),
                ..RetryConfig::default()
            },
        })
    }
}
