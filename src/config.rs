//! Run configuration and default constants

use std::path::PathBuf;
use std::time::Duration;

use crate::fetcher::binance_config::USDT_FUTURES_BASE_URL;
use crate::{Interval, TimeWindow};
use chrono::{DateTime, Utc};

/// Maximum number of retries for a single request.
/// 5 retries means the sixth consecutive throttled or failed attempt is fatal
/// for the dataset being fetched.
pub const MAX_RETRIES: u32 = 5;

/// Initial backoff delay, doubled after every retry.
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(5);

/// Cap applied to the backoff after a throttled (429/418) response.
pub const MAX_RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(60);

/// Overall timeout for a single HTTP request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Binance page cap for klines and index/mark/premium klines
pub const MAX_KLINE_LIMIT: usize = 1500;

/// Binance page cap for statistics and funding endpoints
pub const MAX_STAT_LIMIT: usize = 500;

/// Symbols collected when none are configured
pub const DEFAULT_SYMBOLS: &[&str] = &["ARBUSDT", "BTCUSDT", "ETHUSDT"];

/// Days of history collected per run
pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;

/// Output directory for CSV files
pub const DEFAULT_OUT_DIR: &str = "data";

/// Retry policy knobs for the HTTP fetcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// First backoff delay
    pub initial_backoff: Duration,
    /// Ceiling for the rate-limit backoff
    pub max_backoff: Duration,
    /// Per-request timeout
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            initial_backoff: INITIAL_BACKOFF,
            max_backoff: MAX_RATE_LIMIT_BACKOFF,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl RetryConfig {
    /// Total number of attempts a request may make
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }
}

/// Configuration for one collection run.
///
/// Built once (normally from the CLI) and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectorConfig {
    /// REST base URL
    pub base_url: String,
    /// Symbols to collect, in order
    pub symbols: Vec<String>,
    /// Interval for klines and index/mark/premium klines
    pub interval: Interval,
    /// Lookback window in days
    pub lookback_days: u32,
    /// Directory receiving the CSV files
    pub out_dir: PathBuf,
    /// Statistics period for open interest
    pub oi_period: Interval,
    /// Statistics period for long/short ratios and taker volume
    pub ratio_period: Interval,
    /// Rows per page for kline-like endpoints
    pub kline_limit: usize,
    /// Rows per page for statistics and funding endpoints
    pub stat_limit: usize,
    /// HTTP retry policy
    pub retry: RetryConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            base_url: USDT_FUTURES_BASE_URL.to_string(),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            interval: Interval::FifteenMinutes,
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            oi_period: Interval::OneHour,
            ratio_period: Interval::OneHour,
            kline_limit: MAX_KLINE_LIMIT,
            stat_limit: MAX_STAT_LIMIT,
            retry: RetryConfig::default(),
        }
    }
}

impl CollectorConfig {
    /// Lookback window ending at `now`
    pub fn window_at(&self, now: DateTime<Utc>) -> TimeWindow {
        TimeWindow::ending_at(now, self.lookback_days)
    }
}
