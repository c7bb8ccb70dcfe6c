//! Per-symbol dataset tasks

use std::path::PathBuf;

use crate::config::CollectorConfig;
use crate::fetcher::{FetcherResult, JsonFetcher};
use crate::output::{OutputError, OutputPathBuilder};
use crate::series::{self, SeriesKind, Table, KLINE_COLUMNS, PRICE_KLINE_COLUMNS};
use crate::{Dataset, TimeWindow};

/// One symbol × dataset unit of work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetTask {
    /// Dataset being collected
    pub dataset: Dataset,
    /// Trading symbol (e.g., "BTCUSDT")
    pub symbol: String,
    /// Row shape and fixed query parameter
    pub kind: SeriesKind,
    /// Rows requested per page
    pub limit: usize,
    /// Destination file
    pub output_path: PathBuf,
}

impl DatasetTask {
    /// Build the task for `dataset` under `config`
    pub fn new(
        dataset: Dataset,
        symbol: &str,
        config: &CollectorConfig,
    ) -> Result<Self, OutputError> {
        let (kind, limit) = match dataset {
            Dataset::Klines => (
                SeriesKind::Candle {
                    columns: KLINE_COLUMNS,
                    interval: config.interval,
                },
                config.kline_limit,
            ),
            Dataset::IndexPrice | Dataset::MarkPrice | Dataset::PremiumIndex => (
                SeriesKind::Candle {
                    columns: PRICE_KLINE_COLUMNS,
                    interval: config.interval,
                },
                config.kline_limit,
            ),
            Dataset::OpenInterest => (
                SeriesKind::PeriodStatistic {
                    period: Some(config.oi_period),
                },
                config.stat_limit,
            ),
            Dataset::GlobalLongShort
            | Dataset::TopLongShortAccounts
            | Dataset::TopLongShortPositions
            | Dataset::TakerVolume => (
                SeriesKind::PeriodStatistic {
                    period: Some(config.ratio_period),
                },
                config.stat_limit,
            ),
            Dataset::FundingRate => (SeriesKind::FundingRate, config.stat_limit),
        };

        let mut path = OutputPathBuilder::new(config.out_dir.clone(), symbol)
            .with_dataset(dataset)
            .with_lookback_days(config.lookback_days);
        if let Some(interval) = kind.interval() {
            path = path.with_interval(interval);
        }

        Ok(Self {
            dataset,
            symbol: symbol.to_string(),
            kind,
            limit,
            output_path: path.build()?,
        })
    }

    /// Every dataset for `symbol`, in collection order
    pub fn plan(symbol: &str, config: &CollectorConfig) -> Result<Vec<Self>, OutputError> {
        Dataset::ALL
            .iter()
            .map(|dataset| Self::new(*dataset, symbol, config))
            .collect()
    }

    /// Run the series adapter for this task
    pub async fn fetch<F>(&self, fetcher: &F, window: &TimeWindow) -> FetcherResult<Table>
    where
        F: JsonFetcher + ?Sized,
    {
        series::fetch_series(
            fetcher,
            self.kind,
            self.dataset.endpoint(),
            &self.symbol,
            self.limit,
            window,
        )
        .await
    }
}
