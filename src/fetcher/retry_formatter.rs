//! Retry message formatting for the throttled fetcher.
//!
//! Keeps retry, give-up and failure log lines uniform across the network and
//! rate-limit paths.

use std::time::Duration;

use super::transport::TransportErrorKind;

/// Classification of request failures for log messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryErrorType {
    /// Request or connect timeout
    NetworkTimeout,
    /// Connection refused, DNS or TLS failure
    NetworkOffline,
    /// Other transport failure
    NetworkGeneric,
    /// HTTP 429 or 418
    RateLimit(u16),
    /// HTTP 400
    InvalidRequest,
    /// Any other non-2xx status
    HttpStatus(u16),
}

impl RetryErrorType {
    /// Classify a transport failure
    pub fn from_transport(kind: TransportErrorKind) -> Self {
        match kind {
            TransportErrorKind::Timeout => Self::NetworkTimeout,
            TransportErrorKind::Connect => Self::NetworkOffline,
            TransportErrorKind::Other => Self::NetworkGeneric,
        }
    }

    /// Classify a non-200 status
    pub fn from_status(status: u16) -> Self {
        match status {
            429 | 418 => Self::RateLimit(status),
            400 => Self::InvalidRequest,
            other => Self::HttpStatus(other),
        }
    }

    /// Short description used inside log messages
    pub fn description(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "network timeout",
            Self::NetworkOffline => "connection failed",
            Self::NetworkGeneric => "network error",
            Self::RateLimit(418) => "IP ban (418)",
            Self::RateLimit(_) => "rate limit exceeded",
            Self::InvalidRequest => "invalid request",
            Self::HttpStatus(code) => match code {
                500 => "internal server error",
                502 => "bad gateway",
                503 => "service unavailable",
                504 => "gateway timeout",
                _ => "unexpected HTTP status",
            },
        }
    }

    /// Remediation hint printed with terminal failures
    pub fn suggestion(&self) -> &'static str {
        match self {
            Self::NetworkTimeout => "Check your network connection and firewall settings",
            Self::NetworkOffline => "Verify internet connectivity and DNS resolution",
            Self::NetworkGeneric => "Check network connectivity and try again",
            Self::RateLimit(_) => "Reduce the symbol list or run less frequently",
            Self::InvalidRequest => "Check symbol, interval and period values",
            Self::HttpStatus(_) => "Exchange may be experiencing issues, try again later",
        }
    }

    /// Whether the fetcher retries this failure
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NetworkTimeout | Self::NetworkOffline | Self::NetworkGeneric | Self::RateLimit(_)
        )
    }
}

/// Context for formatting retry messages
#[derive(Debug, Clone)]
pub struct RetryContext {
    /// Current attempt number (1-based)
    pub attempt: u32,
    /// Maximum number of attempts configured
    pub max_attempts: u32,
    /// What went wrong
    pub error_type: RetryErrorType,
    /// Sleep before the next attempt
    pub backoff_duration: Duration,
    /// Endpoint path
    pub endpoint: String,
    /// Rendered query parameters
    pub params: String,
    /// Underlying error text
    pub error_message: String,
}

impl RetryContext {
    /// Build a context for one attempt
    pub fn new(
        attempt: u32,
        max_attempts: u32,
        error_type: RetryErrorType,
        endpoint: impl Into<String>,
        params: impl Into<String>,
    ) -> Self {
        Self {
            attempt,
            max_attempts,
            error_type,
            backoff_duration: Duration::ZERO,
            endpoint: endpoint.into(),
            params: params.into(),
            error_message: String::new(),
        }
    }

    /// Set the upcoming sleep
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff_duration = backoff;
        self
    }

    /// Set the underlying error text
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into();
        self
    }

    /// One-line retry notice
    pub fn format_retry(&self) -> String {
        let mut message = format!(
            "Retrying (attempt {}/{}) after {} - waiting {:.2} seconds",
            self.attempt,
            self.max_attempts,
            self.error_type.description(),
            self.backoff_duration.as_secs_f64()
        );
        append_endpoint(&mut message, &self.endpoint, &self.params);
        message
    }

    /// Multi-line give-up summary
    pub fn format_failure(&self) -> String {
        let mut lines = vec![format!(
            "[FAILED] Request failed after {} attempts",
            self.attempt
        )];
        if !self.error_message.is_empty() {
            lines.push(format!("  Last error: {}", self.error_message));
        }
        lines.push(format!("  Reason: {}", self.error_type.description()));
        lines.push(format!("  Endpoint: {}", self.endpoint));
        if !self.params.is_empty() {
            lines.push(format!("  Params: {}", self.params));
        }
        lines.push("  Suggestions:".to_string());
        for suggestion in self.format_suggestions() {
            lines.push(format!("    - {suggestion}"));
        }
        lines.join("\n")
    }

    /// Suggestions tailored to the failure
    pub fn format_suggestions(&self) -> Vec<String> {
        let mut suggestions = vec![self.error_type.suggestion().to_string()];
        if self.error_type.is_retryable() {
            suggestions.push(format!(
                "Try increasing --max-retries (current: {})",
                self.max_attempts.saturating_sub(1)
            ));
        }
        suggestions
    }
}

fn append_endpoint(buffer: &mut String, endpoint: &str, params: &str) {
    if endpoint.is_empty() {
        return;
    }
    buffer.push_str(" (");
    buffer.push_str(endpoint);
    if !params.is_empty() {
        buffer.push('?');
        buffer.push_str(params);
    }
    buffer.push(')');
}
