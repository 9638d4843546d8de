//! The seam between the sequencer and the orchestration engine.

use std::sync::Arc;

use argus_core::{CallOutcome, Catalog, InvestigationReport, ReportSection, SubjectInput};
use async_trait::async_trait;

use crate::error::PassError;

/// Input to one collect step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectRequest {
    pub subject: SubjectInput,
    /// Overrides the configured selection limit.
    pub limit: Option<usize>,
    /// Restricts selection to these source ids.
    pub sources: Option<Vec<String>>,
}

/// An engine the sequencer can drive.
///
/// One execution takes a single [`snapshot`](Self::snapshot) when it starts
/// and hands it to every collect and assemble call, so catalog updates made
/// while it runs only affect later executions.
#[async_trait]
pub trait OrchestrationPass: Send + Sync {
    /// The catalog as of now.
    fn snapshot(&self) -> Arc<Catalog>;

    /// Select, dispatch and merge for one subject.
    ///
    /// # Errors
    ///
    /// Returns [`PassError`] when the pass cannot run (e.g. no report id
    /// can be generated). Individual call failures are outcomes, not errors.
    async fn collect(
        &self,
        catalog: &Arc<Catalog>,
        request: &CollectRequest,
    ) -> Result<InvestigationReport, PassError>;

    /// Build report sections from outcomes gathered across steps.
    fn assemble(&self, catalog: &Catalog, outcomes: &[CallOutcome]) -> Vec<ReportSection>;
}
