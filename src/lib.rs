//! # Market Data Collector Library
//!
//! Scheduled batch collector for Binance USDS-M futures public market data.
//! Each run walks a fixed list of symbols and, for every symbol, pulls ten
//! datasets (candles, open interest, funding rate, long/short ratios, taker
//! volume, index/mark/premium price klines) over a fixed lookback window and
//! writes each one as a de-duplicated, chronologically ordered CSV file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use market_data_collector::collector::Collector;
//! use market_data_collector::config::CollectorConfig;
//! use market_data_collector::fetcher::binance_http::BinanceHttpClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CollectorConfig::default();
//! let client = BinanceHttpClient::from_config(&config)?;
//!
//! let stats = Collector::new(client, config).run().await;
//! println!("persisted={} skipped={}", stats.success, stats.skipped);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`fetcher`] - Throttled HTTP fetcher and backward-cursor pagination engine
//! - [`series`] - Adapters shaping paginated rows into tables (candle, statistic, funding)
//! - [`collector`] - Sequential symbol × dataset driver with run statistics
//! - [`output`] - File naming and CSV persistence with a metadata header
//! - [`config`] - Run configuration and default constants
//! - [`cli`] - Command-line surface
//! - [`metrics`] - Request, retry and dataset counters

#![warn(missing_docs)]
#![warn(clippy::all)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// CLI argument parsing
pub mod cli;

/// Sequential collection driver
pub mod collector;

/// Run configuration
pub mod config;

/// HTTP fetcher and pagination
pub mod fetcher;

/// Observability counters
pub mod metrics;

/// File naming and CSV output
pub mod output;

/// Series adapters
pub mod series;

use fetcher::binance_config::{self, EndpointDescriptor};

/// Milliseconds in one day
pub const DAY_MS: i64 = 86_400_000;

/// Kline / statistics interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// 1 minute
    #[serde(rename = "1m")]
    OneMinute,
    /// 3 minutes
    #[serde(rename = "3m")]
    ThreeMinutes,
    /// 5 minutes
    #[serde(rename = "5m")]
    FiveMinutes,
    /// 15 minutes
    #[serde(rename = "15m")]
    FifteenMinutes,
    /// 30 minutes
    #[serde(rename = "30m")]
    ThirtyMinutes,
    /// 1 hour
    #[serde(rename = "1h")]
    OneHour,
    /// 2 hours
    #[serde(rename = "2h")]
    TwoHours,
    /// 4 hours
    #[serde(rename = "4h")]
    FourHours,
    /// 6 hours
    #[serde(rename = "6h")]
    SixHours,
    /// 8 hours
    #[serde(rename = "8h")]
    EightHours,
    /// 12 hours
    #[serde(rename = "12h")]
    TwelveHours,
    /// 1 day
    #[serde(rename = "1d")]
    OneDay,
    /// 3 days
    #[serde(rename = "3d")]
    ThreeDays,
    /// 1 week
    #[serde(rename = "1w")]
    OneWeek,
    /// 1 month
    #[serde(rename = "1M")]
    OneMonth,
}

impl Interval {
    /// Whether the `/futures/data/*` statistics endpoints accept this value as `period`
    pub fn is_stat_period(&self) -> bool {
        matches!(
            self,
            Interval::FiveMinutes
                | Interval::FifteenMinutes
                | Interval::ThirtyMinutes
                | Interval::OneHour
                | Interval::TwoHours
                | Interval::FourHours
                | Interval::SixHours
                | Interval::TwelveHours
                | Interval::OneDay
        )
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::TwoHours => "2h",
            Interval::FourHours => "4h",
            Interval::SixHours => "6h",
            Interval::EightHours => "8h",
            Interval::TwelveHours => "12h",
            Interval::OneDay => "1d",
            Interval::ThreeDays => "3d",
            Interval::OneWeek => "1w",
            Interval::OneMonth => "1M",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Interval {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1m" => Ok(Interval::OneMinute),
            "3m" => Ok(Interval::ThreeMinutes),
            "5m" => Ok(Interval::FiveMinutes),
            "15m" => Ok(Interval::FifteenMinutes),
            "30m" => Ok(Interval::ThirtyMinutes),
            "1h" => Ok(Interval::OneHour),
            "2h" => Ok(Interval::TwoHours),
            "4h" => Ok(Interval::FourHours),
            "6h" => Ok(Interval::SixHours),
            "8h" => Ok(Interval::EightHours),
            "12h" => Ok(Interval::TwelveHours),
            "1d" => Ok(Interval::OneDay),
            "3d" => Ok(Interval::ThreeDays),
            "1w" => Ok(Interval::OneWeek),
            "1M" => Ok(Interval::OneMonth),
            _ => Err(format!("Invalid interval: {s}")),
        }
    }
}

/// One named time series collected per symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// Futures klines
    Klines,
    /// Open interest statistics
    OpenInterest,
    /// Funding rate history
    FundingRate,
    /// Global long/short account ratio
    GlobalLongShort,
    /// Top trader long/short ratio (accounts)
    TopLongShortAccounts,
    /// Top trader long/short ratio (positions)
    TopLongShortPositions,
    /// Taker buy/sell volume
    TakerVolume,
    /// Index price klines
    IndexPrice,
    /// Mark price klines
    MarkPrice,
    /// Premium index klines
    PremiumIndex,
}

impl Dataset {
    /// Every dataset in collection order
    pub const ALL: [Dataset; 10] = [
        Dataset::Klines,
        Dataset::OpenInterest,
        Dataset::FundingRate,
        Dataset::GlobalLongShort,
        Dataset::TopLongShortAccounts,
        Dataset::TopLongShortPositions,
        Dataset::TakerVolume,
        Dataset::IndexPrice,
        Dataset::MarkPrice,
        Dataset::PremiumIndex,
    ];

    /// Short name used in output file names and log lines
    pub fn slug(&self) -> &'static str {
        match self {
            Dataset::Klines => "klines",
            Dataset::OpenInterest => "oi",
            Dataset::FundingRate => "funding",
            Dataset::GlobalLongShort => "global_ls",
            Dataset::TopLongShortAccounts => "top_ls_accounts",
            Dataset::TopLongShortPositions => "top_ls_positions",
            Dataset::TakerVolume => "taker_vol",
            Dataset::IndexPrice => "index",
            Dataset::MarkPrice => "mark",
            Dataset::PremiumIndex => "premium",
        }
    }

    /// Endpoint backing this dataset
    pub fn endpoint(&self) -> &'static EndpointDescriptor {
        match self {
            Dataset::Klines => &binance_config::KLINES,
            Dataset::OpenInterest => &binance_config::OPEN_INTEREST_HIST,
            Dataset::FundingRate => &binance_config::FUNDING_RATE,
            Dataset::GlobalLongShort => &binance_config::GLOBAL_LONG_SHORT_ACCOUNT_RATIO,
            Dataset::TopLongShortAccounts => &binance_config::TOP_LONG_SHORT_ACCOUNT_RATIO,
            Dataset::TopLongShortPositions => &binance_config::TOP_LONG_SHORT_POSITION_RATIO,
            Dataset::TakerVolume => &binance_config::TAKER_BUY_SELL_VOLUME,
            Dataset::IndexPrice => &binance_config::INDEX_PRICE_KLINES,
            Dataset::MarkPrice => &binance_config::MARK_PRICE_KLINES,
            Dataset::PremiumIndex => &binance_config::PREMIUM_INDEX_KLINES,
        }
    }
}

impl std::fmt::Display for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Lookback window anchored at a collection instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Collection instant (Unix timestamp in milliseconds)
    pub now_ms: i64,
    /// Days of history to keep
    pub lookback_days: u32,
}

impl TimeWindow {
    /// Window ending at `now`
    pub fn ending_at(now: DateTime<Utc>, lookback_days: u32) -> Self {
        Self {
            now_ms: now.timestamp_millis(),
            lookback_days,
        }
    }

    /// Oldest timestamp a collected row may carry (inclusive)
    pub fn earliest_ms(&self) -> i64 {
        self.now_ms - i64::from(self.lookback_days) * DAY_MS
    }
}
