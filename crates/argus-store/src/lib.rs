//! # argus-store
//!
//! Persistence for the pieces of Argus that outlive a run: the source
//! catalog, workflow definitions, and workflow execution history.
//!
//! [`ConfigStore`] is the seam the engine and sequencer talk to.
//! [`FileStore`] keeps everything under one directory:
//!
//! ```text
//! .argus/
//!   sources.toml       [[source]] tables, catalog order = file order
//!   workflows.toml     [[workflow]] tables
//!   executions.jsonl   one WorkflowExecution per line, append-only
//!   store.write.lock   held while a TOML file is rewritten
//!   running/           one lock file per workflow with a live execution
//! ```
//!
//! [`MemoryStore`] holds the same data in memory for tests and embedding.

mod error;
mod file;
mod lock;
mod memory;
mod seed;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use seed::builtin_catalog;

use argus_core::{Catalog, SourceDescriptor, WorkflowDefinition, WorkflowExecution};

/// Outcome of [`ConfigStore::claim_workflow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Claim {
    Acquired,
    /// Another execution holds the workflow.
    HeldBy(String),
}

/// Configuration rows and execution history.
pub trait ConfigStore: Send + Sync {
    /// The full catalog, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the catalog cannot be read or is invalid.
    fn list_sources(&self) -> Result<Catalog, StoreError>;

    /// Add a source, or replace the one with the same id in place.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for an invalid descriptor.
    fn upsert_source(&self, source: SourceDescriptor) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no source has that id.
    fn remove_source(&self, id: &str) -> Result<SourceDescriptor, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError`] if the workflows cannot be read.
    fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>, StoreError>;

    /// Add a workflow, or replace the one with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Invalid`] for an invalid definition.
    fn upsert_workflow(&self, workflow: WorkflowDefinition) -> Result<(), StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no workflow has that id.
    fn remove_workflow(&self, id: &str) -> Result<WorkflowDefinition, StoreError>;

    /// Record an execution. Called once per terminal execution.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be written.
    fn save_execution_log(&self, execution: &WorkflowExecution) -> Result<(), StoreError>;

    /// Executions oldest first, optionally for one workflow.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be read.
    fn list_executions(
        &self,
        workflow_id: Option<&str>,
    ) -> Result<Vec<WorkflowExecution>, StoreError>;

    /// Mark `workflow_id` as running `execution_id` unless another
    /// execution already holds it. Claims are shared by everything using
    /// the same store, across processes for [`FileStore`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the claim cannot be recorded.
    fn claim_workflow(&self, workflow_id: &str, execution_id: &str) -> Result<Claim, StoreError>;

    /// Drop the claim `execution_id` holds on `workflow_id`. A claim held by
    /// another execution is left alone.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the claim cannot be removed.
    fn release_workflow(&self, workflow_id: &str, execution_id: &str) -> Result<(), StoreError>;

    /// The execution currently holding `workflow_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if claims cannot be read.
    fn running_execution(&self, workflow_id: &str) -> Result<Option<String>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no source has that id.
    fn get_source(&self, id: &str) -> Result<SourceDescriptor, StoreError> {
        self.list_sources()?
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity_type: "source",
                id: id.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no workflow has that id.
    fn get_workflow(&self, id: &str) -> Result<WorkflowDefinition, StoreError> {
        self.list_workflows()?
            .into_iter()
            .find(|w| w.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity_type: "workflow",
                id: id.to_string(),
            })
    }

    /// Most recent execution of a workflow, by start time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the log cannot be read.
    fn last_execution(&self, workflow_id: &str) -> Result<Option<WorkflowExecution>, StoreError> {
        Ok(self
            .list_executions(Some(workflow_id))?
            .into_iter()
            .max_by_key(|e| e.started_at))
    }

    /// Add every built-in source whose id is not already present.
    /// Returns the number of sources added.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the catalog cannot be read or written.
    fn seed_builtin_sources(&self) -> Result<usize, StoreError> {
        let existing = self.list_sources()?;
        let mut added = 0;
        for source in builtin_catalog()?.sources() {
            if existing.get(&source.id).is_none() {
                self.upsert_source(source.clone())?;
                added += 1;
            }
        }
        tracing::info!(added, "seeded built-in sources");
        Ok(added)
    }
}
