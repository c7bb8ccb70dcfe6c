//! Observability metrics for the collector
//!
//! Counters and histograms for HTTP requests, 429/418 responses, retry
//! backoff and dataset outcomes. Recording is a no-op until a recorder is
//! installed; [`init_metrics`] installs a Prometheus scrape listener.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

static CORRELATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metrics setup error
#[derive(Debug, thiserror::Error)]
#[error("failed to install Prometheus exporter: {0}")]
pub struct MetricsError(String);

/// Install the Prometheus exporter listening on `addr`.
///
/// Idempotent: later calls return `Ok(())` without reinstalling. Must be
/// called from inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), MetricsError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| {
            METRICS_INITIALIZED.store(false, Ordering::SeqCst);
            MetricsError(e.to_string())
        })?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "HTTP requests sent to the exchange"
    );
    describe_counter!(
        "http_429_errors_total",
        Unit::Count,
        "Throttled (429/418) responses received"
    );
    describe_counter!("http_retries_total", Unit::Count, "Retry attempts");
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration"
    );
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Sleep applied before a retry"
    );
    describe_counter!(
        "datasets_persisted_total",
        Unit::Count,
        "Datasets written to disk"
    );
    describe_counter!(
        "datasets_skipped_total",
        Unit::Count,
        "Datasets skipped (empty or failed)"
    );

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Next correlation ID for request tracing
pub fn generate_correlation_id() -> String {
    let id = CORRELATION_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("req-{id:08x}")
}

/// Timing and outcome of one HTTP attempt
pub struct HttpRequestMetrics {
    endpoint: String,
    start_time: Instant,
    correlation_id: String,
    attempt: u32,
}

impl HttpRequestMetrics {
    /// Start timing an attempt
    pub fn start(endpoint: impl Into<String>, attempt: u32) -> Self {
        Self {
            endpoint: endpoint.into(),
            start_time: Instant::now(),
            correlation_id: generate_correlation_id(),
            attempt,
        }
    }

    /// Record an attempt that produced a status code
    pub fn record_complete(&self, status_code: u16) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => status_code.to_string(),
        )
        .increment(1);
        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        if status_code == 429 || status_code == 418 {
            counter!(
                "http_429_errors_total",
                "endpoint" => self.endpoint.clone(),
                "status" => status_code.to_string(),
            )
            .increment(1);
        }

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            attempt = self.attempt,
            status = status_code,
            duration_ms = duration.as_millis() as u64,
            "HTTP request completed"
        );
    }

    /// Record an attempt that failed below HTTP
    pub fn record_network_error(&self) {
        let duration = self.start_time.elapsed();

        counter!(
            "http_requests_total",
            "endpoint" => self.endpoint.clone(),
            "status" => "network_error",
        )
        .increment(1);
        histogram!(
            "http_request_duration_seconds",
            "endpoint" => self.endpoint.clone(),
        )
        .record(duration.as_secs_f64());

        debug!(
            correlation_id = %self.correlation_id,
            endpoint = %self.endpoint,
            attempt = self.attempt,
            duration_ms = duration.as_millis() as u64,
            "HTTP request failed before a response"
        );
    }
}

/// Record a retry sleep
pub fn record_retry_backoff(duration: Duration, attempt: u32) {
    counter!("http_retries_total", "attempt" => attempt.to_string()).increment(1);
    histogram!("retry_backoff_duration_seconds").record(duration.as_secs_f64());
}

/// Outcome tracking for one symbol × dataset task
pub struct DatasetMetrics {
    dataset: &'static str,
    symbol: String,
    start_time: Instant,
}

impl DatasetMetrics {
    /// Start tracking a dataset
    pub fn start(dataset: &'static str, symbol: impl Into<String>) -> Self {
        Self {
            dataset,
            symbol: symbol.into(),
            start_time: Instant::now(),
        }
    }

    /// Dataset written with `rows` data rows
    pub fn record_persisted(&self, rows: usize) {
        counter!(
            "datasets_persisted_total",
            "dataset" => self.dataset,
            "symbol" => self.symbol.clone(),
        )
        .increment(1);
        debug!(
            dataset = self.dataset,
            symbol = %self.symbol,
            rows,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Dataset persisted"
        );
    }

    /// Dataset skipped for `reason` (`empty` or `error`)
    pub fn record_skipped(&self, reason: &'static str) {
        counter!(
            "datasets_skipped_total",
            "dataset" => self.dataset,
            "symbol" => self.symbol.clone(),
            "reason" => reason,
        )
        .increment(1);
        debug!(
            dataset = self.dataset,
            symbol = %self.symbol,
            reason,
            duration_ms = self.start_time.elapsed().as_millis() as u64,
            "Dataset skipped"
        );
    }
}
