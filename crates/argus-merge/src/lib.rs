//! # argus-merge
//!
//! Turns successful call outcomes into report sections.
//!
//! Each response is normalized by the adapter registered for its source
//! (see [`adapters`]), facts are grouped by topic and deduplicated by
//! normalized key, and every section gets a visualization chosen from the
//! shape of its facts (see [`visual`]).

pub mod adapters;
pub mod error;
pub mod merger;
pub mod visual;

pub use adapters::{Adapter, AdapterRegistry, HintAdapter, OfficerAdapter};
pub use error::NormalizeError;
pub use merger::{Merger, NO_DATA_TITLE};
