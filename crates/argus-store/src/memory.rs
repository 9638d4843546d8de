//! In-memory store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use argus_core::{Catalog, SourceDescriptor, WorkflowDefinition, WorkflowExecution};

use crate::{Claim, ConfigStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    catalog: Catalog,
    workflows: Vec<WorkflowDefinition>,
    executions: Vec<WorkflowExecution>,
    /// workflow id → execution id
    claims: HashMap<String, String>,
}

/// Store that keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_catalog(catalog: Catalog) -> Self {
        Self {
            inner: Mutex::new(Inner {
                catalog,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ConfigStore for MemoryStore {
    fn list_sources(&self) -> Result<Catalog, StoreError> {
        Ok(self.lock().catalog.clone())
    }

    fn upsert_source(&self, source: SourceDescriptor) -> Result<(), StoreError> {
        self.lock().catalog.upsert(source)?;
        Ok(())
    }

    fn remove_source(&self, id: &str) -> Result<SourceDescriptor, StoreError> {
        self.lock()
            .catalog
            .remove(id)
            .map_err(|_| StoreError::NotFound {
                entity_type: "source",
                id: id.to_string(),
            })
    }

    fn list_workflows(&self) -> Result<Vec<WorkflowDefinition>, StoreError> {
        Ok(self.lock().workflows.clone())
    }

    fn upsert_workflow(&self, workflow: WorkflowDefinition) -> Result<(), StoreError> {
        workflow.validate()?;
        let mut inner = self.lock();
        match inner.workflows.iter_mut().find(|w| w.id == workflow.id) {
            Some(existing) => *existing = workflow,
            None => inner.workflows.push(workflow),
        }
        Ok(())
    }

    fn remove_workflow(&self, id: &str) -> Result<WorkflowDefinition, StoreError> {
        let mut inner = self.lock();
        let index = inner
            .workflows
            .iter()
            .position(|w| w.id == id)
            .ok_or_else(|| StoreError::NotFound {
                entity_type: "workflow",
                id: id.to_string(),
            })?;
        Ok(inner.workflows.remove(index))
    }

    fn save_execution_log(&self, execution: &WorkflowExecution) -> Result<(), StoreError> {
        self.lock().executions.push(execution.clone());
        Ok(())
    }

    fn list_executions(
        &self,
        workflow_id: Option<&str>,
    ) -> Result<Vec<WorkflowExecution>, StoreError> {
        Ok(self
            .lock()
            .executions
            .iter()
            .filter(|e| workflow_id.is_none_or(|id| e.workflow_id == id))
            .cloned()
            .collect())
    }

    fn claim_workflow(&self, workflow_id: &str, execution_id: &str) -> Result<Claim, StoreError> {
        let mut inner = self.lock();
        if let Some(holder) = inner.claims.get(workflow_id) {
            return Ok(Claim::HeldBy(holder.clone()));
        }
        inner
            .claims
            .insert(workflow_id.to_string(), execution_id.to_string());
        Ok(Claim::Acquired)
    }

    fn release_workflow(&self, workflow_id: &str, execution_id: &str) -> Result<(), StoreError> {
        let mut inner = self.lock();
        if inner.claims.get(workflow_id).is_some_and(|holder| holder == execution_id) {
            inner.claims.remove(workflow_id);
        }
        Ok(())
    }

    fn running_execution(&self, workflow_id: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().claims.get(workflow_id).cloned())
    }
}
