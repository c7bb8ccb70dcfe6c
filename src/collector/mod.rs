//! Collection driver
//!
//! Walks every configured symbol and, for each one, the ten datasets in a
//! fixed order. Everything runs sequentially: one symbol, one dataset, one
//! page at a time.
//!
//! # Overview
//!
//! 1. **Planning**: [`task::DatasetTask::plan`] builds the per-symbol task list
//! 2. **Fetching**: each task runs its series adapter through the [`JsonFetcher`]
//! 3. **Persisting**: non-empty tables are written with
//!    [`crate::output::write_with_metadata`]
//!
//! # Error Handling
//!
//! A failing dataset never aborts the run. Fetch, parse and write errors are
//! logged with dataset/symbol context and counted as skipped; the next task
//! runs as usual. The run succeeds if at least one dataset was persisted.

use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::CollectorConfig;
use crate::fetcher::{FetcherError, JsonFetcher};
use crate::metrics::DatasetMetrics;
use crate::output::{write_with_metadata, OutputError};
use crate::TimeWindow;

pub mod task;

pub use task::DatasetTask;

/// Collection errors
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Fetch, pagination or row shaping failed
    #[error("fetcher error: {0}")]
    Fetcher(#[from] FetcherError),

    /// Output path or write failed
    #[error("output error: {0}")]
    Output(#[from] OutputError),
}

/// Result of one symbol × dataset task
#[derive(Debug)]
pub enum FetchOutcome {
    /// Table written to `path`
    Persisted {
        /// Data rows written
        rows: u64,
        /// Output file
        path: PathBuf,
    },
    /// Adapter returned no rows; nothing written
    SkippedEmpty,
    /// Fetch or write failed
    SkippedError {
        /// What went wrong
        error: CollectorError,
    },
}

impl FetchOutcome {
    /// Whether a file was written
    pub fn is_persisted(&self) -> bool {
        matches!(self, FetchOutcome::Persisted { .. })
    }
}

/// Run-level counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Datasets persisted
    pub success: u32,
    /// Datasets skipped (empty or failed)
    pub skipped: u32,
}

impl RunStats {
    /// Count one task outcome
    pub fn record(&mut self, outcome: &FetchOutcome) {
        if outcome.is_persisted() {
            self.success += 1;
        } else {
            self.skipped += 1;
        }
    }

    /// At least one dataset was persisted
    pub fn is_success(&self) -> bool {
        self.success > 0
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }
}

/// Sequential symbol × dataset driver
pub struct Collector<F> {
    fetcher: F,
    config: CollectorConfig,
}

impl<F: JsonFetcher> Collector<F> {
    /// Create a collector over `fetcher`
    pub fn new(fetcher: F, config: CollectorConfig) -> Self {
        Self { fetcher, config }
    }

    /// Run configuration
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Underlying page source
    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Collect every symbol with the window ending now
    pub async fn run(&self) -> RunStats {
        self.run_at(Utc::now()).await
    }

    /// Collect every symbol with the window ending at `now`
    ///
    /// `now` is also the collection time written to each file's metadata line.
    pub async fn run_at(&self, now: DateTime<Utc>) -> RunStats {
        let window = self.config.window_at(now);
        info!(
            symbols = ?self.config.symbols,
            interval = %self.config.interval,
            days = self.config.lookback_days,
            out_dir = %self.config.out_dir.display(),
            "Starting collection"
        );

        let mut stats = RunStats::default();
        for symbol in &self.config.symbols {
            self.collect_symbol(symbol, &window, now, &mut stats).await;
        }

        info!(
            success = stats.success,
            skipped = stats.skipped,
            "Collection finished"
        );
        stats
    }

    /// Collect all datasets for one symbol, updating `stats`
    pub async fn collect_symbol(
        &self,
        symbol: &str,
        window: &TimeWindow,
        collected_at: DateTime<Utc>,
        stats: &mut RunStats,
    ) {
        info!("Collecting data for {}", symbol);

        let tasks = match DatasetTask::plan(symbol, &self.config) {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(symbol, error = %e, "Failed to plan datasets");
                stats.skipped += crate::Dataset::ALL.len() as u32;
                return;
            }
        };

        for task in &tasks {
            let outcome = self.run_task(task, window, collected_at).await;
            stats.record(&outcome);
        }
    }

    /// Fetch and persist one task; never fails
    pub async fn run_task(
        &self,
        task: &DatasetTask,
        window: &TimeWindow,
        collected_at: DateTime<Utc>,
    ) -> FetchOutcome {
        let metrics = DatasetMetrics::start(task.dataset.slug(), &task.symbol);

        let table = match task.fetch(&self.fetcher, window).await {
            Ok(table) => table,
            Err(e) => {
                error!(
                    dataset = %task.dataset,
                    symbol = %task.symbol,
                    path = %task.output_path.display(),
                    error = %e,
                    "Failed to collect dataset"
                );
                metrics.record_skipped("error");
                return FetchOutcome::SkippedError { error: e.into() };
            }
        };

        if table.is_empty() {
            warn!(
                dataset = %task.dataset,
                symbol = %task.symbol,
                "No data returned for {}",
                task.output_path.display()
            );
            metrics.record_skipped("empty");
            return FetchOutcome::SkippedEmpty;
        }

        match write_with_metadata(&task.output_path, &table, collected_at) {
            Ok(rows) => {
                metrics.record_persisted(rows as usize);
                FetchOutcome::Persisted {
                    rows,
                    path: task.output_path.clone(),
                }
            }
            Err(e) => {
                error!(
                    dataset = %task.dataset,
                    symbol = %task.symbol,
                    path = %task.output_path.display(),
                    error = %e,
                    "Failed to write dataset"
                );
                metrics.record_skipped("error");
                FetchOutcome::SkippedError { error: e.into() }
            }
        }
    }
}
