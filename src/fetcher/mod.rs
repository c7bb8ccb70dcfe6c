//! HTTP fetcher and pagination engine
//!
//! - [`transport`] issues one raw GET
//! - [`binance_http`] classifies responses and applies the retry/backoff policy
//! - [`pagination`] walks a backward time cursor and merges pages
//! - [`binance_config`] holds the endpoint descriptors

use async_trait::async_trait;
use serde_json::Value;

pub mod backoff;
pub mod binance_config;
pub mod binance_http;
pub mod pagination;
pub mod retry_formatter;
pub mod transport;

/// Query parameters in request order
pub type QueryParams = Vec<(&'static str, String)>;

/// Fetcher errors
///
/// Every variant is fatal for the dataset being fetched; the collection
/// driver catches it and moves on to the next dataset.
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Network failure persisted past the retry ceiling
    #[error("network error after {attempts} attempts: {message}")]
    Network {
        /// Attempts made
        attempts: u32,
        /// Last transport error
        message: String,
    },

    /// Throttling (429/418) persisted past the retry ceiling
    #[error("rate limited for {url} after {attempts} attempts")]
    RateLimitExhausted {
        /// Request URL
        url: String,
        /// Attempts made
        attempts: u32,
    },

    /// Non-retryable HTTP status
    #[error("HTTP error {status}: {body}")]
    HttpStatus {
        /// Status code
        status: u16,
        /// Response text
        body: String,
    },

    /// Response parse error
    #[error("parse error: {0}")]
    ParseError(String),

    /// API contract violation
    #[error("API error: {0}")]
    ApiError(String),

    /// HTTP client could not be constructed
    #[error("HTTP client error: {0}")]
    ClientBuild(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Source of JSON pages.
///
/// `Ok(None)` means "no usable data for this request" (HTTP 400 and
/// non-200 2xx responses); it ends pagination without an error.
#[async_trait]
pub trait JsonFetcher: Send + Sync {
    /// Fetch one JSON document from `path` with `params`
    async fn fetch(&self, path: &str, params: &[(&'static str, String)])
        -> FetcherResult<Option<Value>>;
}

/// Render params as `k=v&k=v` for log lines
pub fn format_params(params: &[(&'static str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}
