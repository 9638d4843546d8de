//! Per-source response adapters.
//!
//! An [`Adapter`] turns one raw source payload into [`ParsedFact`]s. The
//! [`AdapterRegistry`] picks the adapter registered for a source id and
//! falls back to the generic [`HintAdapter`], which is driven by the
//! source's [`ResponseHint`].

mod hint;
mod opencorporates;

use std::collections::HashMap;
use std::sync::Arc;

use argus_core::{ParsedFact, ResponseHint};
use serde_json::Value;

use crate::error::NormalizeError;

pub use hint::HintAdapter;
pub use opencorporates::OfficerAdapter;

pub trait Adapter: Send + Sync {
    /// Normalize one successful response.
    ///
    /// # Errors
    ///
    /// Returns [`NormalizeError`] when the payload does not have the shape
    /// the adapter expects.
    fn normalize(
        &self,
        raw: &Value,
        hint: &ResponseHint,
    ) -> Result<Vec<ParsedFact>, NormalizeError>;
}

/// Adapters keyed by source id.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
    fallback: HintAdapter,
}

impl AdapterRegistry {
    /// Empty registry: every source uses the hint-driven adapter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the adapters for built-in sources whose responses the
    /// hint format cannot describe.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register("opencorporates-officers", Arc::new(OfficerAdapter));
        registry
    }

    /// Register (or replace) the adapter for `source_id`.
    pub fn register(&mut self, source_id: impl Into<String>, adapter: Arc<dyn Adapter>) {
        self.adapters.insert(source_id.into(), adapter);
    }

    #[must_use]
    pub fn adapter_for(&self, source_id: &str) -> &dyn Adapter {
        self.adapters
            .get(source_id)
            .map_or(&self.fallback as &dyn Adapter, |adapter| adapter.as_ref())
    }

    #[must_use]
    pub fn has_dedicated(&self, source_id: &str) -> bool {
        self.adapters.contains_key(source_id)
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<&str> = self.adapters.keys().map(String::as_str).collect();
        ids.sort_unstable();
        f.debug_struct("AdapterRegistry").field("dedicated", &ids).finish()
    }
}
