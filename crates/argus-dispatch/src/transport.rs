//! HTTP transport seam.
//!
//! The dispatcher never talks to `reqwest` directly; it goes through
//! [`Transport`] so tests can drive retries, timeouts and rate limits
//! without a network.

use std::collections::BTreeMap;
use std::time::Duration;

use argus_core::FailureKind;
use argus_core::enums::HttpMethod;
use async_trait::async_trait;
use serde_json::Value;

use crate::error::{CallError, DispatchError};

/// A fully built request for one source call.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: BTreeMap<String, String>,
    /// JSON body, for POST sources.
    pub body: Option<Value>,
}

/// Raw response before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    /// Parsed `Retry-After` header, in seconds form only.
    pub retry_after: Option<Duration>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    #[must_use]
    pub const fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Errors are transport-level only (connect, timeout,
    /// body read); HTTP error statuses come back as responses.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, CallError>;
}

/// Production transport backed by a shared `reqwest::Client`.
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// # Errors
    ///
    /// Returns [`DispatchError::Client`] if the TLS backend fails to
    /// initialize.
    pub fn new(user_agent: &str) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, CallError> {
        let mut builder = match request.method {
            HttpMethod::Get => self.http.get(&request.url),
            HttpMethod::Post => self.http.post(&request.url),
        };
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(map_reqwest_error)?;
        let status = resp.status().as_u16();
        let retry_after = parse_retry_after(&resp);
        let body = resp.text().await.map_err(|e| {
            CallError::new(FailureKind::Decode, format!("failed to read body: {e}"))
                .with_status(status)
        })?;
        Ok(TransportResponse {
            status,
            retry_after,
            body,
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> CallError {
    if e.is_timeout() {
        CallError::new(FailureKind::Timeout, e.to_string())
    } else if e.is_builder() {
        CallError::new(FailureKind::Request, e.to_string())
    } else {
        CallError::new(FailureKind::Network, e.to_string())
    }
}

/// Parse the `Retry-After` header as whole seconds.
fn parse_retry_after(resp: &reqwest::Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}
