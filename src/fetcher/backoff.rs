//! Exponential backoff with jitter
//!
//! One [`Backoff`] lives for the duration of a single request's retry loop.
//! Network failures double it without a ceiling; throttled responses double it
//! up to the configured cap.

use rand::Rng;
use std::time::Duration;

/// Backoff state for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    cap: Duration,
}

impl Backoff {
    /// Start at `initial`; rate-limit doubling stops at `cap`
    pub fn new(initial: Duration, cap: Duration) -> Self {
        Self {
            current: initial,
            cap,
        }
    }

    /// Delay to apply before the next retry
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Advance after a network failure
    pub fn after_network_error(&mut self) {
        self.current = self.current.saturating_mul(2);
    }

    /// Advance after a 429/418 response
    pub fn after_rate_limit(&mut self) {
        self.current = self.current.saturating_mul(2).min(self.cap);
    }
}

/// Add uniform jitter in `[0, 1)` seconds
pub fn with_jitter(delay: Duration) -> Duration {
    let jitter: f64 = rand::thread_rng().gen_range(0.0..1.0);
    delay + Duration::from_secs_f64(jitter)
}

/// Parse a `Retry-After` value expressed in seconds.
///
/// Decimal values are accepted. HTTP-date values, negatives and non-finite
/// numbers yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let secs: f64 = value.trim().parse().ok()?;
    Duration::try_from_secs_f64(secs).ok()
}
