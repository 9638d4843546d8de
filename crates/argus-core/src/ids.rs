//! ID prefixes and generation.
//!
//! Ids are `{prefix}-{8 hex chars}`, e.g. `exe-1a2b3c4d`.

use crate::errors::CoreError;

pub const PREFIX_EXECUTION: &str = "exe";
pub const PREFIX_INVESTIGATION: &str = "inv";

/// Generate a new random id with the given prefix.
///
/// # Errors
///
/// Returns [`CoreError::Validation`] if the OS random source is unavailable.
pub fn generate_id(prefix: &str) -> Result<String, CoreError> {
    let mut bytes = [0u8; 4];
    getrandom::fill(&mut bytes)
        .map_err(|e| CoreError::Validation(format!("failed to generate id: {e}")))?;
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("{prefix}-{suffix}"))
}

/// Split an id into its prefix and random suffix.
#[must_use]
pub fn split_id(id: &str) -> Option<(&str, &str)> {
    let (prefix, suffix) = id.split_once('-')?;
    let valid = suffix.len() == 8 && suffix.chars().all(|c| c.is_ascii_hexdigit());
    valid.then_some((prefix, suffix))
}
