//! Store error types.

use std::path::PathBuf;

use argus_core::CoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A store file exists but does not parse.
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Failed to serialize {what}: {message}")]
    Serialize { what: &'static str, message: String },

    /// Another writer kept the store locked past the wait timeout.
    #[error("Store is locked at {path} by {holder}")]
    Locked { path: PathBuf, holder: String },

    #[error("{entity_type} '{id}' not found")]
    NotFound { entity_type: &'static str, id: String },

    /// Stored or submitted data failed validation.
    #[error(transparent)]
    Invalid(#[from] CoreError),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
