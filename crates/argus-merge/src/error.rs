//! Normalization error types.

use thiserror::Error;

/// Why a source response could not be turned into facts.
///
/// A normalization error never fails a merge; it degrades the section the
/// response belongs to.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("response has nothing at '{pointer}'")]
    MissingRoot { pointer: String },

    #[error("expected {expected} at '{pointer}', found {found}")]
    Shape {
        pointer: String,
        expected: &'static str,
        found: String,
    },
}

impl NormalizeError {
    pub(crate) fn shape(pointer: &str, expected: &'static str, found: &serde_json::Value) -> Self {
        Self::Shape {
            pointer: pointer.to_string(),
            expected,
            found: describe(found).to_string(),
        }
    }
}

/// Short name of a JSON value's type.
pub(crate) const fn describe(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
