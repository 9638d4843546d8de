//! Dispatch error types.

use std::time::Duration;

use argus_core::FailureKind;
use thiserror::Error;

/// Errors constructing a dispatcher. Individual calls never error; they
/// produce failure outcomes.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// A classified failure of one call attempt.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message}")]
pub struct CallError {
    pub kind: FailureKind,
    pub message: String,
    pub http_status: Option<u16>,
    /// Provider-requested wait, for rate limits.
    pub retry_after: Option<Duration>,
}

impl CallError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            http_status: None,
            retry_after: None,
        }
    }

    #[must_use]
    pub const fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    #[must_use]
    pub const fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("no response within {} ms", after.as_millis()),
        )
    }
}
