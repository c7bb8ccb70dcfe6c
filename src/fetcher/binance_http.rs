//! Throttled HTTP fetcher for Binance public endpoints
//!
//! One call to [`BinanceHttpClient::get`] sends GET requests until it can
//! return a terminal outcome:
//! - 200: parsed JSON body
//! - 429/418: sleep (`Retry-After` or backoff, plus jitter) and retry
//! - network failure: sleep (backoff plus jitter) and retry
//! - 400: `None`, no retry
//! - any other non-2xx: error, no retry
//!
//! Retries stop after [`RetryConfig::max_retries`]; exhaustion is an error.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::backoff::{parse_retry_after, with_jitter, Backoff};
use super::retry_formatter::{RetryContext, RetryErrorType};
use super::transport::{HttpTransport, RawResponse, ReqwestTransport};
use super::{format_params, FetcherError, FetcherResult, JsonFetcher};
use crate::config::{CollectorConfig, RetryConfig};
use crate::metrics::{record_retry_backoff, HttpRequestMetrics};

/// HTTP client applying the retry/backoff policy on top of a transport
pub struct BinanceHttpClient<T = ReqwestTransport> {
    transport: T,
    base_url: String,
    retry: RetryConfig,
}

impl BinanceHttpClient<ReqwestTransport> {
    /// Build a `reqwest`-backed client from the run configuration
    pub fn from_config(config: &CollectorConfig) -> FetcherResult<Self> {
        let transport = ReqwestTransport::new(config.retry.request_timeout)?;
        Ok(Self::new(transport, config.base_url.clone(), config.retry))
    }
}

impl<T: HttpTransport> BinanceHttpClient<T> {
    /// Create a client over `transport`
    ///
    /// # Arguments
    /// * `transport` - Issues the raw GET requests
    /// * `base_url` - Base URL for API endpoints (e.g., "<https://fapi.binance.com>")
    /// * `retry` - Retry ceiling and backoff settings
    pub fn new(transport: T, base_url: impl Into<String>, retry: RetryConfig) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        }
    }

    /// Configured retry ceiling
    pub fn max_retries(&self) -> u32 {
        self.retry.max_retries
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// GET `endpoint` with `params`, applying the retry policy
    ///
    /// # Returns
    /// `Some(json)` on HTTP 200, `None` on HTTP 400 or another 2xx
    ///
    /// # Errors
    /// - [`FetcherError::RateLimitExhausted`] when 429/418 persists past the ceiling
    /// - [`FetcherError::Network`] when transport failures persist past the ceiling
    /// - [`FetcherError::HttpStatus`] for any other non-2xx status
    /// - [`FetcherError::ParseError`] when a 200 body is not JSON
    pub async fn get(
        &self,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> FetcherResult<Option<Value>> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("Making GET request to: {} with {} params", url, params.len());
        self.request_with_retry(&url, endpoint, params).await
    }

    async fn request_with_retry(
        &self,
        url: &str,
        endpoint: &str,
        params: &[(&'static str, String)],
    ) -> FetcherResult<Option<Value>> {
        let max_attempts = self.retry.max_attempts();
        let mut backoff = Backoff::new(self.retry.initial_backoff, self.retry.max_backoff);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let request_metrics = HttpRequestMetrics::start(endpoint, attempt);

            let response = match self.transport.get(url, params).await {
                Ok(response) => response,
                Err(err) => {
                    request_metrics.record_network_error();
                    let context = RetryContext::new(
                        attempt,
                        max_attempts,
                        RetryErrorType::from_transport(err.kind),
                        endpoint,
                        format_params(params),
                    )
                    .with_error(err.to_string());

                    if attempt > self.retry.max_retries {
                        error!(url, attempts = attempt, "{}", context.format_failure());
                        return Err(FetcherError::Network {
                            attempts: attempt,
                            message: err.message,
                        });
                    }

                    let delay = with_jitter(backoff.current());
                    warn!(url, error = %err, "{}", context.with_backoff(delay).format_retry());
                    record_retry_backoff(delay, attempt);
                    sleep(delay).await;
                    backoff.after_network_error();
                    continue;
                }
            };

            request_metrics.record_complete(response.status);

            match response.status {
                200 => return parse_body(&response).map(Some),
                429 | 418 => {
                    let context = RetryContext::new(
                        attempt,
                        max_attempts,
                        RetryErrorType::from_status(response.status),
                        endpoint,
                        format_params(params),
                    );

                    if attempt > self.retry.max_retries {
                        error!(
                            url,
                            status = response.status,
                            attempts = attempt,
                            "{}",
                            context.format_failure()
                        );
                        return Err(FetcherError::RateLimitExhausted {
                            url: url.to_string(),
                            attempts: attempt,
                        });
                    }

                    let delay = with_jitter(self.rate_limit_delay(&response, &backoff));
                    warn!(
                        url,
                        status = response.status,
                        retry_after = response.retry_after.as_deref(),
                        "{}",
                        context.with_backoff(delay).format_retry()
                    );
                    record_retry_backoff(delay, attempt);
                    sleep(delay).await;
                    backoff.after_rate_limit();
                }
                400 => {
                    error!(
                        url,
                        params = %format_params(params),
                        body = %response.body,
                        "Bad request, giving up on this page"
                    );
                    return Ok(None);
                }
                status if (200..300).contains(&status) => {
                    debug!(url, status, "Non-200 success status, no data");
                    return Ok(None);
                }
                status => {
                    error!(
                        url,
                        status,
                        body = %response.body,
                        "{}",
                        RetryContext::new(
                            attempt,
                            max_attempts,
                            RetryErrorType::from_status(status),
                            endpoint,
                            format_params(params),
                        )
                        .with_error(response.body.clone())
                        .format_failure()
                    );
                    return Err(FetcherError::HttpStatus {
                        status,
                        body: response.body,
                    });
                }
            }
        }
    }

    /// Server-supplied delay if usable, else the current backoff
    fn rate_limit_delay(&self, response: &RawResponse, backoff: &Backoff) -> Duration {
        match response.retry_after.as_deref() {
            Some(raw) => parse_retry_after(raw).unwrap_or_else(|| {
                warn!(retry_after = raw, "Unparseable Retry-After header, using backoff");
                backoff.current()
            }),
            None => backoff.current(),
        }
    }
}

fn parse_body(response: &RawResponse) -> FetcherResult<Value> {
    serde_json::from_str(&response.body)
        .map_err(|e| FetcherError::ParseError(format!("Failed to deserialize response: {e}")))
}

#[async_trait]
impl<T: HttpTransport> JsonFetcher for BinanceHttpClient<T> {
    async fn fetch(
        &self,
        path: &str,
        params: &[(&'static str, String)],
    ) -> FetcherResult<Option<Value>> {
        self.get(path, params).await
    }
}
