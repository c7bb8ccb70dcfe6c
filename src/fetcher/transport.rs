//! Raw HTTP transport
//!
//! The retry policy in [`super::binance_http`] only needs a status code, the
//! `Retry-After` header and the body text, so the transport reduces every
//! response to a [`RawResponse`] and every failure to a classified
//! [`TransportError`].

use async_trait::async_trait;
use reqwest::header::RETRY_AFTER;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::{FetcherError, FetcherResult};

/// One HTTP response reduced to what the retry policy inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Raw `Retry-After` header value, if any
    pub retry_after: Option<String>,
    /// Response body text
    pub body: String,
}

impl RawResponse {
    /// Response with a status and body and no `Retry-After`
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    /// Attach a `Retry-After` value
    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }
}

/// Network-level failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Request or connect timeout
    Timeout,
    /// Connection refused, DNS failure, TLS failure
    Connect,
    /// Anything else (body read, protocol errors)
    Other,
}

/// Request never produced an HTTP status
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    /// Failure category
    pub kind: TransportErrorKind,
    /// Underlying error text
    pub message: String,
}

impl TransportError {
    /// Build a transport error
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_connect() {
            TransportErrorKind::Connect
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// Issues a single GET
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// GET `url` with `params` as the query string
    async fn get(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<RawResponse, TransportError>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a client with an overall per-request timeout
    pub fn new(timeout: Duration) -> FetcherResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetcherError::ClientBuild(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(
        &self,
        url: &str,
        params: &[(&'static str, String)],
    ) -> Result<RawResponse, TransportError> {
        let response = self.client.get(url).query(params).send().await?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        debug!(url, status, bytes = body.len(), "HTTP response received");
        Ok(RawResponse {
            status,
            retry_after,
            body,
        })
    }
}
