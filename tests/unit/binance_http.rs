//! Retry and backoff behaviour of BinanceHttpClient against a scripted transport
//!
//! Runs on Tokio's paused clock, so backoff sleeps complete instantly while
//! the gaps between attempts are still measurable.

use async_trait::async_trait;
use market_data_collector::config::RetryConfig;
use market_data_collector::fetcher::binance_http::BinanceHttpClient;
use market_data_collector::fetcher::transport::{
    HttpTransport, RawResponse, TransportError, TransportErrorKind,
};
use market_data_collector::fetcher::FetcherError;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Replays queued outcomes, then repeats `fallback`
struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    fallback: Result<RawResponse, TransportError>,
    calls: Mutex<Vec<Instant>>,
}

impl ScriptedTransport {
    fn new(
        script: Vec<Result<RawResponse, TransportError>>,
        fallback: Result<RawResponse, TransportError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn always(outcome: Result<RawResponse, TransportError>) -> Self {
        Self::new(Vec::new(), outcome)
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn gaps(&self) -> Vec<Duration> {
        let calls = self.calls.lock().unwrap();
        calls.windows(2).map(|w| w[1] - w[0]).collect()
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn get(
        &self,
        _url: &str,
        _params: &[(&'static str, String)],
    ) -> Result<RawResponse, TransportError> {
        self.calls.lock().unwrap().push(Instant::now());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

fn client(transport: ScriptedTransport, max_retries: u32) -> BinanceHttpClient<ScriptedTransport> {
    let retry = RetryConfig {
        max_retries,
        ..RetryConfig::default()
    };
    BinanceHttpClient::new(transport, "https://fapi.binance.com", retry)
}

fn throttled(retry_after: &str) -> Result<RawResponse, TransportError> {
    Ok(RawResponse::new(429, "").with_retry_after(retry_after))
}

fn timeout() -> Result<RawResponse, TransportError> {
    Err(TransportError::new(TransportErrorKind::Timeout, "operation timed out"))
}

/// `gap` is `base` plus jitter in [0, 1s), allowing for timer rounding
fn assert_jittered(gap: Duration, base: Duration) {
    assert!(gap >= base, "gap {gap:?} shorter than {base:?}");
    assert!(
        gap < base + Duration::from_millis(1010),
        "gap {gap:?} longer than {base:?} plus jitter"
    );
}

#[tokio::test(start_paused = true)]
async fn test_retry_after_honoured_until_ceiling() {
    let http_client = client(ScriptedTransport::always(throttled("3")), 5);

    let err = http_client
        .get("/fapi/v1/klines", &[("symbol", "BTCUSDT".to_string())])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetcherError::RateLimitExhausted { attempts: 6, .. }
    ));
    assert_eq!(http_client.transport().call_count(), 6);

    let gaps = http_client.transport().gaps();
    assert_eq!(gaps.len(), 5);
    for gap in gaps {
        assert_jittered(gap, Duration::from_secs(3));
    }
}

#[tokio::test(start_paused = true)]
async fn test_418_is_throttled_like_429() {
    let transport = ScriptedTransport::new(
        vec![Ok(RawResponse::new(418, "").with_retry_after("2"))],
        Ok(RawResponse::new(200, "[]")),
    );
    let http_client = client(transport, 5);

    let value = http_client.get("/fapi/v1/klines", &[]).await.unwrap();
    assert_eq!(value, Some(json!([])));
    assert_jittered(http_client.transport().gaps()[0], Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_rate_limit_backoff_doubles_and_caps() {
    let http_client = client(
        ScriptedTransport::always(Ok(RawResponse::new(429, ""))),
        5,
    );

    assert!(http_client.get("/fapi/v1/klines", &[]).await.is_err());

    let expected = [5, 10, 20, 40, 60];
    let gaps = http_client.transport().gaps();
    assert_eq!(gaps.len(), expected.len());
    for (gap, secs) in gaps.into_iter().zip(expected) {
        assert_jittered(gap, Duration::from_secs(secs));
    }
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_retry_after_uses_backoff() {
    let transport = ScriptedTransport::new(
        vec![throttled("Wed, 21 Oct 2015 07:28:00 GMT")],
        Ok(RawResponse::new(200, "[]")),
    );
    let http_client = client(transport, 5);

    assert!(http_client.get("/fapi/v1/klines", &[]).await.is_ok());
    assert_jittered(http_client.transport().gaps()[0], Duration::from_secs(5));
}

#[tokio::test]
async fn test_bad_request_returns_none_without_retry() {
    let http_client = client(
        ScriptedTransport::always(Ok(RawResponse::new(400, r#"{"code":-1121}"#))),
        5,
    );

    let value = http_client.get("/fapi/v1/klines", &[]).await.unwrap();
    assert_eq!(value, None);
    assert_eq!(http_client.transport().call_count(), 1);
}

#[tokio::test]
async fn test_server_error_is_not_retried() {
    let http_client = client(
        ScriptedTransport::always(Ok(RawResponse::new(502, "bad gateway"))),
        5,
    );

    let err = http_client.get("/fapi/v1/klines", &[]).await.unwrap_err();
    assert!(matches!(err, FetcherError::HttpStatus { status: 502, .. }));
    assert_eq!(http_client.transport().call_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_errors_back_off_then_succeed() {
    let transport = ScriptedTransport::new(
        vec![
            timeout(),
            Err(TransportError::new(
                TransportErrorKind::Connect,
                "connection refused",
            )),
        ],
        Ok(RawResponse::new(200, r#"[[1,"2"]]"#)),
    );
    let http_client = client(transport, 5);

    let value = http_client.get("/fapi/v1/klines", &[]).await.unwrap();
    assert_eq!(value, Some(json!([[1, "2"]])));

    let gaps = http_client.transport().gaps();
    assert_jittered(gaps[0], Duration::from_secs(5));
    assert_jittered(gaps[1], Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_network_backoff_is_not_capped() {
    let http_client = client(ScriptedTransport::always(timeout()), 5);

    let err = http_client.get("/fapi/v1/klines", &[]).await.unwrap_err();
    assert!(matches!(err, FetcherError::Network { attempts: 6, .. }));

    let gaps = http_client.transport().gaps();
    assert_jittered(gaps[4], Duration::from_secs(80));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_shared_between_network_and_rate_limit() {
    let transport = ScriptedTransport::new(
        vec![timeout(), Ok(RawResponse::new(429, ""))],
        Ok(RawResponse::new(200, "[]")),
    );
    let http_client = client(transport, 5);

    assert!(http_client.get("/fapi/v1/klines", &[]).await.is_ok());

    let gaps = http_client.transport().gaps();
    assert_jittered(gaps[0], Duration::from_secs(5));
    assert_jittered(gaps[1], Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_resets_between_calls() {
    let transport = ScriptedTransport::new(
        vec![
            Ok(RawResponse::new(429, "")),
            Ok(RawResponse::new(200, "[]")),
            Ok(RawResponse::new(429, "")),
        ],
        Ok(RawResponse::new(200, "[]")),
    );
    let http_client = client(transport, 5);

    http_client.get("/fapi/v1/klines", &[]).await.unwrap();
    http_client.get("/fapi/v1/klines", &[]).await.unwrap();

    let gaps = http_client.transport().gaps();
    assert_jittered(gaps[0], Duration::from_secs(5));
    assert_jittered(gaps[2], Duration::from_secs(5));
}

#[tokio::test(start_paused = true)]
async fn test_custom_retry_ceiling() {
    let http_client = client(ScriptedTransport::always(throttled("0")), 1);
    assert_eq!(http_client.max_retries(), 1);

    let err = http_client.get("/fapi/v1/klines", &[]).await.unwrap_err();
    assert!(matches!(
        err,
        FetcherError::RateLimitExhausted { attempts: 2, .. }
    ));
    assert_eq!(http_client.transport().call_count(), 2);
}
