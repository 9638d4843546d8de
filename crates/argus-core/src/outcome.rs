//! Call outcomes: the audit record of every dispatched candidate.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::candidate::QueryCandidate;

/// Classified reason a call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Network,
    /// HTTP 5xx.
    ServerError,
    /// HTTP 4xx other than 429.
    ClientError,
    /// HTTP 429 whose cooldown did not fit the wait budget.
    RateLimited,
    /// Missing or rejected credentials.
    Auth,
    /// Response body could not be read.
    Decode,
    /// Request could not be built (bad template, invalid URL).
    Request,
}

impl FailureKind {
    /// Whether a retry may succeed.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Timeout | Self::Network | Self::ServerError)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Network => "network",
            Self::ServerError => "server_error",
            Self::ClientError => "client_error",
            Self::RateLimited => "rate_limited",
            Self::Auth => "auth",
            Self::Decode => "decode",
            Self::Request => "request",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a candidate was never started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The source was cooling down after a rate limit.
    Cooldown,
    /// The run deadline passed before the call could start.
    Timeout,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cooldown => "cooldown",
            Self::Timeout => "timeout",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    Failure { kind: FailureKind, message: String },
    Skipped { reason: SkipReason },
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Failure { kind, .. } => write!(f, "failure({kind})"),
            Self::Skipped { reason } => write!(f, "skipped({reason})"),
        }
    }
}

/// Result of one dispatched candidate. Exactly one per candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CallOutcome {
    pub source_id: String,
    pub status: CallStatus,
    /// Response body; JSON when the body parsed, otherwise a JSON string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_payload: Option<serde_json::Value>,
    /// Requests sent (0 when skipped).
    pub attempts: u32,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub timestamp: DateTime<Utc>,
    pub bound_params: BTreeMap<String, String>,
}

impl CallOutcome {
    #[must_use]
    pub fn success(
        candidate: &QueryCandidate,
        payload: serde_json::Value,
        http_status: u16,
        attempts: u32,
        latency_ms: u64,
    ) -> Self {
        Self {
            source_id: candidate.source_id.clone(),
            status: CallStatus::Success,
            raw_payload: Some(payload),
            attempts,
            latency_ms,
            http_status: Some(http_status),
            timestamp: Utc::now(),
            bound_params: candidate.bound_params.clone(),
        }
    }

    #[must_use]
    pub fn failure(
        candidate: &QueryCandidate,
        kind: FailureKind,
        message: impl Into<String>,
        http_status: Option<u16>,
        attempts: u32,
        latency_ms: u64,
    ) -> Self {
        Self {
            source_id: candidate.source_id.clone(),
            status: CallStatus::Failure {
                kind,
                message: message.into(),
            },
            raw_payload: None,
            attempts,
            latency_ms,
            http_status,
            timestamp: Utc::now(),
            bound_params: candidate.bound_params.clone(),
        }
    }

    #[must_use]
    pub fn skipped(candidate: &QueryCandidate, reason: SkipReason) -> Self {
        Self {
            source_id: candidate.source_id.clone(),
            status: CallStatus::Skipped { reason },
            raw_payload: None,
            attempts: 0,
            latency_ms: 0,
            http_status: None,
            timestamp: Utc::now(),
            bound_params: candidate.bound_params.clone(),
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.status, CallStatus::Success)
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self.status, CallStatus::Failure { .. })
    }

    #[must_use]
    pub const fn is_skipped(&self) -> bool {
        matches!(self.status, CallStatus::Skipped { .. })
    }

    /// Failure kind, if this outcome is a failure.
    #[must_use]
    pub const fn failure_kind(&self) -> Option<FailureKind> {
        match self.status {
            CallStatus::Failure { kind, .. } => Some(kind),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::SignalKind;
    use pretty_assertions::assert_eq;

    fn candidate() -> QueryCandidate {
        QueryCandidate {
            source_id: "ipinfo".to_string(),
            signal: SignalKind::FreeText,
            bound_params: BTreeMap::from([("ip".to_string(), "8.8.8.8".to_string())]),
            match_tiers: 1,
            priority_score: 1.0,
        }
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let outcome = CallOutcome::failure(&candidate(), FailureKind::Timeout, "timed out", None, 3, 30_000);
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"]["state"], "failure");
        assert_eq!(json["status"]["kind"], "timeout");
        assert_eq!(json["attempts"], 3);
        assert!(json.get("raw_payload").is_none());
    }

    #[test]
    fn skipped_has_no_attempts() {
        let outcome = CallOutcome::skipped(&candidate(), SkipReason::Timeout);
        assert!(outcome.is_skipped());
        assert_eq!(outcome.attempts, 0);
        assert_eq!(outcome.status.to_string(), "skipped(timeout)");
        assert_eq!(
            serde_json::to_value(&outcome.status).unwrap(),
            serde_json::json!({"state": "skipped", "reason": "timeout"})
        );
        assert_eq!(outcome.bound_params["ip"], "8.8.8.8");
    }

    #[test]
    fn transient_kinds() {
        assert!(FailureKind::Timeout.is_transient());
        assert!(FailureKind::ServerError.is_transient());
        assert!(!FailureKind::ClientError.is_transient());
        assert!(!FailureKind::RateLimited.is_transient());
        assert!(!FailureKind::Auth.is_transient());
    }
}
