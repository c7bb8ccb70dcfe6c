//! Series adapters
//!
//! Each dataset is one of three row shapes. A [`SeriesKind`] knows how to
//! build the page query for its shape, where its rows keep their timestamp and
//! how to flatten the merged rows into a [`Table`]:
//!
//! - [`SeriesKind::Candle`]: positional arrays with fixed column names
//! - [`SeriesKind::PeriodStatistic`]: keyed objects with a `period` parameter
//! - [`SeriesKind::FundingRate`]: keyed objects with a `startTime` floor

use serde_json::Value;

use crate::fetcher::binance_config::{EndpointDescriptor, LowerBound};
use crate::fetcher::pagination::{PageQuery, PaginationHelper, TimestampKey};
use crate::fetcher::{FetcherResult, JsonFetcher};
use crate::{Interval, TimeWindow};

pub mod candle;
pub mod keyed;

pub use candle::{KLINE_COLUMNS, PRICE_KLINE_COLUMNS};

/// Tabular record set handed to the CSV writer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    /// Header row
    pub columns: Vec<String>,
    /// Data rows, each `columns.len()` cells wide
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Empty table with the given header
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Row shape of a dataset, together with its fixed query parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Positional kline arrays
    Candle {
        /// Column names, in element order
        columns: &'static [&'static str],
        /// Candle interval
        interval: Interval,
    },
    /// `/futures/data/*` statistics rows
    PeriodStatistic {
        /// Statistics period; omitted from the query when `None`
        period: Option<Interval>,
    },
    /// Funding rate history rows
    FundingRate,
}

impl SeriesKind {
    /// Candle interval or statistics period, if any
    pub fn interval(&self) -> Option<Interval> {
        match self {
            SeriesKind::Candle { interval, .. } => Some(*interval),
            SeriesKind::PeriodStatistic { period } => *period,
            SeriesKind::FundingRate => None,
        }
    }

    /// Where rows of this shape keep their timestamp
    pub fn timestamp_key(&self) -> TimestampKey {
        match self {
            SeriesKind::Candle { .. } => TimestampKey::Index(0),
            SeriesKind::PeriodStatistic { .. } => TimestampKey::Field("timestamp"),
            SeriesKind::FundingRate => TimestampKey::Field("fundingTime"),
        }
    }

    /// Page query for `symbol` on `endpoint` over `window`
    pub fn page_query(
        &self,
        endpoint: &'static EndpointDescriptor,
        symbol: &str,
        limit: usize,
        window: &TimeWindow,
    ) -> PageQuery {
        let earliest_ms = window.earliest_ms();
        let query = PageQuery::new(endpoint, symbol, limit, earliest_ms, self.timestamp_key());

        let query = match self {
            SeriesKind::Candle { interval, .. } => query.with_param("interval", interval),
            SeriesKind::PeriodStatistic { period: Some(period) } => {
                query.with_param("period", period)
            }
            SeriesKind::PeriodStatistic { period: None } => query,
            SeriesKind::FundingRate => query,
        };

        if endpoint.lower_bound == LowerBound::StartTimeFloor {
            query.with_param("startTime", earliest_ms)
        } else {
            query
        }
    }

    /// Flatten merged rows into a table
    pub fn to_table(&self, rows: &[Value], earliest_ms: i64) -> FetcherResult<Table> {
        match self {
            SeriesKind::Candle { columns, .. } => candle::to_table(columns, rows, earliest_ms),
            SeriesKind::PeriodStatistic { .. } | SeriesKind::FundingRate => {
                keyed::to_table(rows, self.timestamp_key())
            }
        }
    }
}

/// Paginate `endpoint` for `symbol` and shape the result as `kind`
///
/// # Errors
/// Any error from the fetcher or pagination, or a row that does not match the
/// expected shape
pub async fn fetch_series<F>(
    fetcher: &F,
    kind: SeriesKind,
    endpoint: &'static EndpointDescriptor,
    symbol: &str,
    limit: usize,
    window: &TimeWindow,
) -> FetcherResult<Table>
where
    F: JsonFetcher + ?Sized,
{
    let query = kind.page_query(endpoint, symbol, limit, window);
    let rows = PaginationHelper::paginate(fetcher, &query).await?;
    kind.to_table(&rows, query.earliest_ms)
}

/// Render one JSON value as a CSV cell
///
/// Strings verbatim, numbers and booleans as their JSON text, `null` empty,
/// nested values as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}
