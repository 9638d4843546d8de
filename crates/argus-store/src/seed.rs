//! Built-in source catalog.

use std::path::PathBuf;

use argus_core::Catalog;

use crate::StoreError;

const BUILTIN_SOURCES: &str = include_str!("../seed/sources.toml");

/// The catalog shipped with Argus. Sources needing keys resolve them from
/// the environment variables named in their `auth` tables.
///
/// # Errors
///
/// Returns [`StoreError::Parse`] if the embedded catalog is malformed.
pub fn builtin_catalog() -> Result<Catalog, StoreError> {
    toml::from_str(BUILTIN_SOURCES).map_err(|e| StoreError::Parse {
        path: PathBuf::from("<builtin>/sources.toml"),
        message: e.to_string(),
    })
}
