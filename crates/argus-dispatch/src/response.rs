//! Response classification.
//!
//! Maps a raw [`TransportResponse`] to either a JSON payload or a
//! [`CallError`] with a [`FailureKind`]:
//! - **2xx** → body parsed as JSON; non-JSON text becomes a JSON string,
//!   an empty body becomes `null`.
//! - **429** → `RateLimited`, carrying `Retry-After` if present.
//! - **401/403** → `Auth`.
//! - other **4xx** → `ClientError`; **5xx** → `ServerError`.
//! - anything else (1xx, unfollowed 3xx) → `ClientError`: the source
//!   answered, just not with data, so retrying will not help.

use argus_core::FailureKind;
use serde_json::Value;

use crate::error::CallError;
use crate::transport::TransportResponse;

/// Longest slice of an error body kept in a failure message.
const MAX_MESSAGE_CHARS: usize = 200;

/// Classify a response.
///
/// # Errors
///
/// Returns a [`CallError`] for any non-2xx status.
pub fn classify(resp: TransportResponse) -> Result<Value, CallError> {
    let status = resp.status;
    let kind = match status {
        200..=299 => return Ok(decode_body(&resp.body)),
        429 => FailureKind::RateLimited,
        401 | 403 => FailureKind::Auth,
        400..=499 => FailureKind::ClientError,
        500..=599 => FailureKind::ServerError,
        _ => FailureKind::ClientError,
    };
    Err(CallError::new(kind, format!("HTTP {status}: {}", excerpt(&resp.body)))
        .with_status(status)
        .with_retry_after(resp.retry_after))
}

fn decode_body(body: &str) -> Value {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    serde_json::from_str(trimmed).unwrap_or_else(|_| Value::String(trimmed.to_string()))
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.chars().count() <= MAX_MESSAGE_CHARS {
        return trimmed.to_string();
    }
    let mut cut: String = trimmed.chars().take(MAX_MESSAGE_CHARS).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    #[test]
    fn json_body_is_parsed() {
        let value = classify(TransportResponse::new(200, r#"{"a": 1}"#)).unwrap();
        assert_eq!(value, json!({"a": 1}));
    }

    #[test]
    fn text_body_becomes_string() {
        let value = classify(TransportResponse::new(200, "available\n")).unwrap();
        assert_eq!(value, json!("available"));
    }

    #[test]
    fn empty_body_is_null() {
        assert_eq!(classify(TransportResponse::new(204, "")).unwrap(), Value::Null);
    }

    #[rstest]
    #[case(429, FailureKind::RateLimited)]
    #[case(401, FailureKind::Auth)]
    #[case(403, FailureKind::Auth)]
    #[case(404, FailureKind::ClientError)]
    #[case(422, FailureKind::ClientError)]
    #[case(500, FailureKind::ServerError)]
    #[case(503, FailureKind::ServerError)]
    #[case(101, FailureKind::ClientError)]
    #[case(302, FailureKind::ClientError)]
    fn error_statuses(#[case] status: u16, #[case] kind: FailureKind) {
        let err = classify(TransportResponse::new(status, "nope")).unwrap_err();
        assert_eq!(err.kind, kind);
        assert_eq!(err.http_status, Some(status));
        assert!(err.message.contains("nope"));
    }

    #[test]
    fn redirects_are_not_retried() {
        let err = classify(TransportResponse::new(301, "moved")).unwrap_err();
        assert!(!err.kind.is_transient());
    }

    #[test]
    fn rate_limit_keeps_retry_after() {
        let resp = TransportResponse::new(429, "").with_retry_after(Duration::from_secs(7));
        let err = classify(resp).unwrap_err();
        assert_eq!(err.retry_after, Some(Duration::from_secs(7)));
    }

    #[test]
    fn long_bodies_are_cut() {
        let body = "x".repeat(1000);
        let err = classify(TransportResponse::new(500, body)).unwrap_err();
        assert!(err.message.chars().count() < 300);
        assert!(err.message.ends_with('…'));
    }
}
