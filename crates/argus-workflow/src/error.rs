//! Workflow error types.

use argus_core::CoreError;
use argus_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow '{0}' not found")]
    NotFound(String),

    /// The workflow already has a non-terminal execution.
    #[error("workflow '{workflow_id}' is already running as {execution_id}")]
    ExecutionConflict {
        workflow_id: String,
        execution_id: String,
    },

    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// An orchestration pass that could not run at all.
///
/// Recorded on the failing collect step; never aborts the execution by
/// itself.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct PassError(pub String);
