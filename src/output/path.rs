//! Output file naming
//!
//! One file per symbol and dataset, directly under the output directory:
//! `{SYMBOL}_{dataset}[_{interval}]_{days}d.csv`
//!
//! # Usage Example
//!
//! ```rust
//! use market_data_collector::output::OutputPathBuilder;
//! use market_data_collector::{Dataset, Interval};
//! use std::path::PathBuf;
//!
//! let path = OutputPathBuilder::new(PathBuf::from("data"), "BTCUSDT")
//!     .with_dataset(Dataset::Klines)
//!     .with_interval(Interval::FifteenMinutes)
//!     .with_lookback_days(30)
//!     .build()
//!     .unwrap();
//! assert_eq!(path, PathBuf::from("data/BTCUSDT_klines_15m_30d.csv"));
//! ```

use super::OutputError;
use crate::{Dataset, Interval};
use std::path::PathBuf;

/// Path builder for per-dataset CSV files
#[derive(Debug, Clone)]
pub struct OutputPathBuilder {
    root_dir: PathBuf,
    symbol: String,
    dataset: Dataset,
    interval: Option<Interval>,
    lookback_days: u32,
}

impl OutputPathBuilder {
    /// Create a new path builder
    ///
    /// # Arguments
    ///
    /// * `root_dir` - Output directory (e.g., "data")
    /// * `symbol` - Trading symbol (e.g., "BTCUSDT")
    ///
    /// # Security
    ///
    /// Symbol is sanitized to prevent path traversal attacks.
    /// Characters `/`, `\`, `:`, `..` are replaced with `_`.
    pub fn new(root_dir: PathBuf, symbol: &str) -> Self {
        Self {
            root_dir,
            symbol: sanitize_symbol(symbol),
            dataset: Dataset::Klines,
            interval: None,
            lookback_days: crate::config::DEFAULT_LOOKBACK_DAYS,
        }
    }

    /// Set dataset
    pub fn with_dataset(mut self, dataset: Dataset) -> Self {
        self.dataset = dataset;
        self
    }

    /// Set the interval or period tag (required for klines, price klines and open interest)
    pub fn with_interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set lookback window length
    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    /// Build the complete file path
    pub fn build(&self) -> Result<PathBuf, OutputError> {
        Ok(self.root_dir.join(self.generate_filename()?))
    }

    fn generate_filename(&self) -> Result<String, OutputError> {
        let slug = self.dataset.slug();
        let days = self.lookback_days;

        match self.dataset {
            Dataset::Klines
            | Dataset::OpenInterest
            | Dataset::IndexPrice
            | Dataset::MarkPrice
            | Dataset::PremiumIndex => {
                let interval = self.interval.ok_or_else(|| {
                    OutputError::ConfigurationError(format!(
                        "Interval required for {slug} file name"
                    ))
                })?;
                Ok(format!("{}_{slug}_{interval}_{days}d.csv", self.symbol))
            }
            Dataset::FundingRate
            | Dataset::GlobalLongShort
            | Dataset::TopLongShortAccounts
            | Dataset::TopLongShortPositions
            | Dataset::TakerVolume => Ok(format!("{}_{slug}_{days}d.csv", self.symbol)),
        }
    }
}

/// Sanitize symbol name for filesystem safety
///
/// - `/`, `\`, `:` → `_`
/// - `..` → `__`
fn sanitize_symbol(name: &str) -> String {
    name.replace("..", "__").replace(['/', '\\', ':'], "_")
}
