//! Cross-cutting error types for Argus.
//!
//! Domain-specific errors (`StoreError`, `OracleError`, `WorkflowError`, ...)
//! live in their respective crates. The CLI converges them with `anyhow`.

use thiserror::Error;

/// Errors that can be raised by any Argus crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (descriptor shape, workflow shape, templates).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown enum tag or malformed identifier.
    #[error("Parse error: {0}")]
    Parse(String),
}
