//! Ranking oracle error types.

use thiserror::Error;

/// Why the ranking oracle gave no usable opinion.
///
/// None of these fail a selection: the selector falls back to the
/// deterministic ordering and records the reason.
#[derive(Debug, Error)]
pub enum OracleError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The oracle returned a non-success status code.
    #[error("oracle error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The oracle answered, but not with a usable ranking.
    #[error("malformed ranking: {0}")]
    Malformed(String),

    /// The oracle did not answer within its time budget.
    #[error("oracle timed out after {0} ms")]
    Timeout(u128),
}
