//! Backward-cursor pagination for Binance time series endpoints
//!
//! Every paginated endpoint returns at most `limit` rows ending at an optional
//! `endTime`. Walking backwards from "now" until the oldest row of a page falls
//! at or below the window's lower edge yields the whole window:
//!
//! 1. First request carries no cursor (most recent page)
//! 2. A full page whose earliest row is still inside the window continues with
//!    `endTime = earliest_ts - 1`
//! 3. A partial page, an empty page, `None` or an API error object ends the walk
//!
//! Includes safety mechanisms:
//! - Maximum iteration limit to prevent infinite loops
//! - Stop when the endpoint ignores the cursor (cursor not decreasing)
//! - Rows merged by timestamp, so overlapping pages never duplicate a row

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, error, warn};

use super::binance_config::EndpointDescriptor;
use super::{format_params, FetcherError, FetcherResult, JsonFetcher, QueryParams};

/// Maximum number of pages fetched for one query
pub const MAX_ITERATIONS: usize = 10_000;

/// Where a row keeps its millisecond timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampKey {
    /// Element of a positional array row (klines use index 0)
    Index(usize),
    /// Field of a keyed object row (`timestamp`, `fundingTime`)
    Field(&'static str),
}

impl TimestampKey {
    /// Extract the timestamp from `row`
    ///
    /// Accepts integer numbers and numeric strings.
    ///
    /// # Errors
    /// [`FetcherError::ParseError`] if the row has no usable timestamp
    pub fn extract(&self, row: &Value) -> FetcherResult<i64> {
        let raw = match self {
            TimestampKey::Index(i) => row.get(*i),
            TimestampKey::Field(name) => row.get(*name),
        };

        let ts = match raw {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
            _ => None,
        };

        ts.ok_or_else(|| {
            FetcherError::ParseError(format!("row has no usable timestamp at {self}: {row}"))
        })
    }
}

impl std::fmt::Display for TimestampKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimestampKey::Index(i) => write!(f, "index {i}"),
            TimestampKey::Field(name) => write!(f, "field '{name}'"),
        }
    }
}

/// Everything needed to walk one endpoint for one symbol
#[derive(Debug, Clone)]
pub struct PageQuery {
    /// Endpoint being walked
    pub endpoint: &'static EndpointDescriptor,
    /// Symbol (or pair) sent under the endpoint's symbol key
    pub symbol: String,
    /// Rows requested per page, already clamped to the endpoint cap
    pub limit: usize,
    /// Oldest timestamp kept (inclusive)
    pub earliest_ms: i64,
    /// Fixed parameters appended after the cursor (interval, period, startTime)
    pub extra_params: QueryParams,
    /// Where rows keep their timestamp
    pub timestamp_key: TimestampKey,
}

impl PageQuery {
    /// New query with no extra parameters
    pub fn new(
        endpoint: &'static EndpointDescriptor,
        symbol: impl Into<String>,
        limit: usize,
        earliest_ms: i64,
        timestamp_key: TimestampKey,
    ) -> Self {
        Self {
            endpoint,
            symbol: symbol.into(),
            limit: endpoint.page_limit(limit),
            earliest_ms,
            extra_params: Vec::new(),
            timestamp_key,
        }
    }

    /// Append a fixed parameter
    pub fn with_param(mut self, key: &'static str, value: impl ToString) -> Self {
        self.extra_params.push((key, value.to_string()));
        self
    }

    /// Request parameters for a page ending at `cursor`
    ///
    /// Order: symbol key, `limit`, cursor (if any), then the extra parameters.
    pub fn params(&self, cursor: Option<i64>) -> QueryParams {
        let mut params = vec![
            (self.endpoint.symbol_param, self.symbol.clone()),
            ("limit", self.limit.to_string()),
        ];
        if let (Some(end_time), Some(cursor_param)) = (cursor, self.endpoint.cursor_param) {
            params.push((cursor_param, end_time.to_string()));
        }
        params.extend(self.extra_params.iter().cloned());
        params
    }
}

/// Position of a backward walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginationState {
    /// No request made yet; the first page has no cursor
    AwaitingFirstPage,
    /// Next page ends at `end_time` (inclusive)
    AwaitingNextPage {
        /// Cursor sent as `endTime`
        end_time: i64,
    },
    /// Walk finished
    Done,
}

impl PaginationState {
    /// Cursor for the next request, if any
    pub fn cursor(&self) -> Option<i64> {
        match self {
            PaginationState::AwaitingNextPage { end_time } => Some(*end_time),
            _ => None,
        }
    }

    /// Transition after a page of `page_len` rows whose first (unfiltered) row
    /// has timestamp `first_ts`
    ///
    /// Continues only when the page was full and its earliest row is still
    /// newer than `earliest_ms`.
    pub fn next_state(page_len: usize, limit: usize, first_ts: i64, earliest_ms: i64) -> Self {
        if page_len == limit && first_ts > earliest_ms {
            PaginationState::AwaitingNextPage {
                end_time: first_ts - 1,
            }
        } else {
            PaginationState::Done
        }
    }
}

/// Pagination helper for Binance API requests
pub struct PaginationHelper;

impl PaginationHelper {
    /// Walk `query` backwards through time using `fetcher`
    ///
    /// # Returns
    /// Rows with timestamp ≥ `earliest_ms`, ascending, one per timestamp
    ///
    /// # Errors
    /// Any fetcher error, a row without a timestamp, or the iteration ceiling
    pub async fn paginate<F>(fetcher: &F, query: &PageQuery) -> FetcherResult<Vec<Value>>
    where
        F: JsonFetcher + ?Sized,
    {
        let mut collected: Vec<(i64, Value)> = Vec::new();
        let mut state = PaginationState::AwaitingFirstPage;
        let mut iteration = 0;

        while state != PaginationState::Done {
            if iteration >= MAX_ITERATIONS {
                return Err(FetcherError::ApiError(format!(
                    "Max iterations ({MAX_ITERATIONS}) exceeded for {} {} - possible infinite loop. Last cursor: {:?}",
                    query.endpoint.path,
                    query.symbol,
                    state.cursor()
                )));
            }
            iteration += 1;

            let cursor = state.cursor();
            let params = query.params(cursor);
            debug!(
                "Fetching page {} of {} for {} ({})",
                iteration,
                query.endpoint.path,
                query.symbol,
                format_params(&params)
            );

            let Some(payload) = fetcher.fetch(query.endpoint.path, &params).await? else {
                debug!("No data returned at page {}, stopping", iteration);
                break;
            };

            let page = match classify_payload(payload) {
                Payload::Rows(rows) => rows,
                Payload::Empty => {
                    debug!(
                        "Empty page received at iteration {}. Total rows collected: {}",
                        iteration,
                        collected.len()
                    );
                    break;
                }
                Payload::ApiError(body) => {
                    error!(
                        endpoint = query.endpoint.path,
                        symbol = %query.symbol,
                        body = %body,
                        "API returned an error object, stopping pagination"
                    );
                    break;
                }
                Payload::Unexpected(body) => {
                    warn!(
                        endpoint = query.endpoint.path,
                        symbol = %query.symbol,
                        body = %body,
                        "Unexpected response shape, stopping pagination"
                    );
                    break;
                }
            };

            let page_len = page.len();
            let mut first_ts = None;
            for row in page {
                let ts = query.timestamp_key.extract(&row)?;
                first_ts.get_or_insert(ts);
                if ts >= query.earliest_ms {
                    collected.push((ts, row));
                }
            }
            let Some(first_ts) = first_ts else {
                break;
            };

            debug!("Received {} rows in page {}", page_len, iteration);

            state = if query.endpoint.cursor_param.is_none() {
                PaginationState::Done
            } else {
                PaginationState::next_state(page_len, query.limit, first_ts, query.earliest_ms)
            };

            if let (Some(previous), Some(next)) = (cursor, state.cursor()) {
                if next >= previous {
                    warn!(
                        endpoint = query.endpoint.path,
                        symbol = %query.symbol,
                        previous_cursor = previous,
                        next_cursor = next,
                        "Cursor did not move backwards, stopping pagination"
                    );
                    state = PaginationState::Done;
                }
            }
        }

        let rows = merge_unique(collected);
        debug!(
            "Pagination completed after {} iterations. Total rows: {}",
            iteration,
            rows.len()
        );
        Ok(rows)
    }
}

/// Deduplicate by timestamp (last write wins) and order ascending
pub fn merge_unique(rows: impl IntoIterator<Item = (i64, Value)>) -> Vec<Value> {
    rows.into_iter()
        .collect::<BTreeMap<i64, Value>>()
        .into_values()
        .collect()
}

enum Payload {
    Rows(Vec<Value>),
    Empty,
    ApiError(Value),
    Unexpected(Value),
}

fn classify_payload(payload: Value) -> Payload {
    match payload {
        Value::Array(rows) if rows.is_empty() => Payload::Empty,
        Value::Array(rows) => Payload::Rows(rows),
        Value::Object(ref map) if map.contains_key("code") => Payload::ApiError(payload),
        Value::Object(ref map) if map.is_empty() => Payload::Empty,
        Value::Null | Value::Bool(false) => Payload::Empty,
        Value::String(ref s) if s.is_empty() => Payload::Empty,
        other => Payload::Unexpected(other),
    }
}
