//! Workflow sequencer.
//!
//! Runs a workflow's steps in index order against an
//! [`OrchestrationPass`], evaluating each step's condition against what
//! earlier steps produced. Manual starts, schedule ticks and fired events
//! all go through [`Sequencer::start`]. A workflow runs at most once at a
//! time: the running execution holds a claim in the store, so a second
//! start from any sequencer sharing that store is an
//! [`WorkflowError::ExecutionConflict`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use argus_core::enums::{ExecutionStatus, FailurePolicy, StepStatus};
use argus_core::ids::{PREFIX_EXECUTION, generate_id};
use argus_core::{
    AnalysisSummary, CallOutcome, Catalog, ReportSection, SignalSet, StepKind, StepLog, StepSpec,
    SubjectInput, Topic, Trigger, TriggerContext, WorkflowDefinition, WorkflowExecution,
};
use argus_store::{Claim, ConfigStore};
use chrono::{DateTime, Utc};
use tokio::time::MissedTickBehavior;

use crate::analysis::summarize;
use crate::condition::EvalContext;
use crate::edit::WorkflowEdit;
use crate::error::WorkflowError;
use crate::pass::{CollectRequest, OrchestrationPass};
use crate::schedule::is_due;

#[derive(Clone)]
pub struct Sequencer {
    store: Arc<dyn ConfigStore>,
    pass: Arc<dyn OrchestrationPass>,
}

/// Releases a workflow's claim when dropped, including on panic or
/// cancellation of the running future.
struct ClaimGuard {
    store: Arc<dyn ConfigStore>,
    workflow_id: String,
    execution_id: String,
}

impl Drop for ClaimGuard {
    fn drop(&mut self) {
        if let Err(e) = self
            .store
            .release_workflow(&self.workflow_id, &self.execution_id)
        {
            tracing::error!(
                workflow = %self.workflow_id,
                execution = %self.execution_id,
                error = %e,
                "failed to release workflow claim"
            );
        }
    }
}

/// Accumulated state of one execution.
struct RunState {
    /// Fixed for the whole execution.
    catalog: Arc<Catalog>,
    subject: SubjectInput,
    signals: SignalSet,
    outcomes: Vec<CallOutcome>,
    sections: Vec<ReportSection>,
    step_status: HashMap<String, StepStatus>,
}

/// What running one step produced.
#[derive(Default)]
struct StepResult {
    outcomes: Vec<CallOutcome>,
    summary: Option<AnalysisSummary>,
    sections: Vec<ReportSection>,
    error: Option<String>,
}

impl Sequencer {
    pub fn new(store: Arc<dyn ConfigStore>, pass: Arc<dyn OrchestrationPass>) -> Self {
        Self { store, pass }
    }

    /// The execution currently running `workflow_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] if claims cannot be read.
    pub fn running_execution(&self, workflow_id: &str) -> Result<Option<String>, WorkflowError> {
        Ok(self.store.running_execution(workflow_id)?)
    }

    fn claim(&self, workflow_id: &str, execution_id: &str) -> Result<ClaimGuard, WorkflowError> {
        match self.store.claim_workflow(workflow_id, execution_id)? {
            Claim::Acquired => Ok(ClaimGuard {
                store: Arc::clone(&self.store),
                workflow_id: workflow_id.to_string(),
                execution_id: execution_id.to_string(),
            }),
            Claim::HeldBy(running) => Err(WorkflowError::ExecutionConflict {
                workflow_id: workflow_id.to_string(),
                execution_id: running,
            }),
        }
    }

    fn ensure_idle(&self, workflow_id: &str) -> Result<(), WorkflowError> {
        match self.store.running_execution(workflow_id)? {
            Some(running) => Err(WorkflowError::ExecutionConflict {
                workflow_id: workflow_id.to_string(),
                execution_id: running,
            }),
            None => Ok(()),
        }
    }

    /// Run a workflow to a terminal state and record the execution.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::NotFound`] for an unknown workflow id.
    /// - [`WorkflowError::ExecutionConflict`] if the workflow is running.
    /// - [`WorkflowError::Store`] if the workflow or execution log cannot
    ///   be read or written.
    pub async fn start(
        &self,
        workflow_id: &str,
        context: TriggerContext,
    ) -> Result<WorkflowExecution, WorkflowError> {
        let workflow = self
            .store
            .list_workflows()?
            .into_iter()
            .find(|w| w.id == workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;

        let execution_id = generate_id(PREFIX_EXECUTION)?;
        let _guard = self.claim(workflow_id, &execution_id)?;

        let mut execution =
            WorkflowExecution::new(execution_id, workflow.id.clone(), context.trigger.clone());
        execution.transition(ExecutionStatus::Running)?;
        tracing::info!(
            workflow = %workflow.id,
            execution = %execution.id,
            trigger = context.trigger.as_str(),
            "workflow started"
        );

        let subject = context.subject.unwrap_or_else(|| workflow.subject.clone());
        let mut state = RunState {
            catalog: self.pass.snapshot(),
            signals: subject.extract(),
            subject,
            outcomes: Vec::new(),
            sections: Vec::new(),
            step_status: HashMap::new(),
        };

        let mut halted = false;
        for (index, step) in workflow.steps.iter().enumerate() {
            let log = self.run_step(index, step, &mut state).await;
            let failed = log.status == StepStatus::Failed;
            state.step_status.insert(step.id.clone(), log.status);
            execution.push_log(log)?;

            if failed && step.on_failure == FailurePolicy::Halt {
                tracing::warn!(
                    workflow = %workflow.id,
                    execution = %execution.id,
                    step = %step.id,
                    "step failed; halting workflow"
                );
                halted = true;
                break;
            }
        }

        let status = if halted {
            ExecutionStatus::Failed
        } else if execution.has_failures() {
            ExecutionStatus::Partial
        } else {
            ExecutionStatus::Succeeded
        };
        execution.transition(status)?;
        tracing::info!(
            workflow = %workflow.id,
            execution = %execution.id,
            status = %execution.status,
            steps = execution.step_logs.len(),
            "workflow finished"
        );

        self.store.save_execution_log(&execution)?;
        Ok(execution)
    }

    async fn run_step(&self, index: usize, step: &StepSpec, state: &mut RunState) -> StepLog {
        let started_at = Utc::now();

        if let Some(condition) = &step.when {
            let ctx = EvalContext {
                signals: &state.signals,
                outcomes: &state.outcomes,
                sections: &state.sections,
                step_status: &state.step_status,
            };
            if !ctx.evaluate(condition) {
                tracing::debug!(step = %step.id, "condition false; skipping step");
                return log(index, step, StepStatus::Skipped, StepResult::default(), started_at);
            }
        }

        let result = match &step.kind {
            StepKind::Collect { limit, sources } => {
                self.collect(state, *limit, sources.clone()).await
            }
            StepKind::Analyze { min_corroboration } => analyze(state, *min_corroboration),
            StepKind::Report { title } => self.report(state, title.as_deref()),
        };
        let status = if result.error.is_some() {
            StepStatus::Failed
        } else {
            StepStatus::Succeeded
        };
        log(index, step, status, result, started_at)
    }

    async fn collect(
        &self,
        state: &mut RunState,
        limit: Option<usize>,
        sources: Option<Vec<String>>,
    ) -> StepResult {
        let request = CollectRequest {
            subject: state.subject.clone(),
            limit,
            sources,
        };
        let report = match self.pass.collect(&state.catalog, &request).await {
            Ok(report) => report,
            Err(e) => {
                return StepResult {
                    error: Some(format!("orchestration pass failed: {e}")),
                    ..StepResult::default()
                };
            }
        };

        let outcomes = report.outcomes;
        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        let error = (!outcomes.is_empty() && succeeded == 0)
            .then(|| format!("none of {} calls succeeded", outcomes.len()));

        state.outcomes.extend(outcomes.iter().cloned());
        state.sections = self.pass.assemble(&state.catalog, &state.outcomes);
        StepResult {
            outcomes,
            error,
            ..StepResult::default()
        }
    }

    fn report(&self, state: &RunState, title: Option<&str>) -> StepResult {
        let mut sections = self.pass.assemble(&state.catalog, &state.outcomes);
        if let Some(title) = title {
            sections.insert(0, overview(title, &sections));
        }
        StepResult {
            sections,
            ..StepResult::default()
        }
    }

    /// Start every scheduled workflow that is due at `now`. Workflows that
    /// are already running are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] if workflows or history cannot be
    /// read.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<Vec<WorkflowExecution>, WorkflowError> {
        let mut due = Vec::new();
        for workflow in self.store.list_workflows()? {
            let last_run = self
                .store
                .last_execution(&workflow.id)?
                .map(|e| e.started_at);
            if is_due(&workflow.trigger, last_run, now) {
                due.push(workflow);
            }
        }
        tracing::debug!(due = due.len(), "schedule tick");

        let mut started = Vec::new();
        for workflow in due {
            let context = TriggerContext {
                trigger: workflow.trigger.clone(),
                subject: None,
                fired_at: now,
            };
            if let Some(execution) = self.start_logged(&workflow, context).await? {
                started.push(execution);
            }
        }
        Ok(started)
    }

    /// Start every workflow bound to the event `name`.
    ///
    /// # Errors
    ///
    /// Returns [`WorkflowError::Store`] if workflows cannot be read.
    pub async fn fire_event(
        &self,
        name: &str,
        subject: Option<SubjectInput>,
    ) -> Result<Vec<WorkflowExecution>, WorkflowError> {
        let bound: Vec<WorkflowDefinition> = self
            .store
            .list_workflows()?
            .into_iter()
            .filter(|w| matches!(&w.trigger, Trigger::Event { name: n } if n == name))
            .collect();
        tracing::info!(event = name, workflows = bound.len(), "event fired");

        let mut started = Vec::new();
        for workflow in bound {
            let context = TriggerContext {
                trigger: workflow.trigger.clone(),
                subject: subject.clone(),
                fired_at: Utc::now(),
            };
            if let Some(execution) = self.start_logged(&workflow, context).await? {
                started.push(execution);
            }
        }
        Ok(started)
    }

    /// Start for a trigger fan-out: conflicts are logged and skipped, other
    /// errors propagate.
    async fn start_logged(
        &self,
        workflow: &WorkflowDefinition,
        context: TriggerContext,
    ) -> Result<Option<WorkflowExecution>, WorkflowError> {
        match self.start(&workflow.id, context).await {
            Ok(execution) => Ok(Some(execution)),
            Err(WorkflowError::ExecutionConflict { execution_id, .. }) => {
                tracing::warn!(
                    workflow = %workflow.id,
                    running = %execution_id,
                    "workflow already running; trigger ignored"
                );
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Call [`tick`](Self::tick) every `every` until `shutdown` resolves.
    /// A tick in progress finishes before the loop stops; a failed tick is
    /// logged and the loop carries on. Returns the number of executions
    /// started.
    pub async fn run_scheduler<F>(&self, every: Duration, shutdown: F) -> usize
    where
        F: Future<Output = ()> + Send,
    {
        // `interval` panics on a zero period.
        let mut ticker = tokio::time::interval(every.max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);
        tracing::info!(every_secs = every.as_secs(), "scheduler started");

        let mut started = 0;
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                _ = ticker.tick() => match self.tick(Utc::now()).await {
                    Ok(executions) => started += executions.len(),
                    Err(e) => tracing::error!(error = %e, "schedule tick failed"),
                },
            }
        }
        tracing::info!(started, "scheduler stopped");
        started
    }

    /// Add or replace a workflow definition.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::ExecutionConflict`] while the workflow is running.
    /// - [`WorkflowError::Store`] if the definition is invalid or cannot be
    ///   saved.
    pub fn save(&self, workflow: WorkflowDefinition) -> Result<(), WorkflowError> {
        self.ensure_idle(&workflow.id)?;
        let id = workflow.id.clone();
        self.store.upsert_workflow(workflow)?;
        tracing::info!(workflow = %id, "workflow saved");
        Ok(())
    }

    /// # Errors
    ///
    /// - [`WorkflowError::ExecutionConflict`] while the workflow is running.
    /// - [`WorkflowError::Store`] if no workflow has that id.
    pub fn remove(&self, workflow_id: &str) -> Result<WorkflowDefinition, WorkflowError> {
        self.ensure_idle(workflow_id)?;
        let removed = self.store.remove_workflow(workflow_id)?;
        tracing::info!(workflow = workflow_id, "workflow removed");
        Ok(removed)
    }

    /// Apply an edit to a stored workflow.
    ///
    /// # Errors
    ///
    /// - [`WorkflowError::NotFound`] for an unknown workflow id.
    /// - [`WorkflowError::ExecutionConflict`] while the workflow is running.
    /// - [`WorkflowError::Invalid`] if the edit leaves it invalid.
    pub fn edit(
        &self,
        workflow_id: &str,
        edit: &WorkflowEdit,
    ) -> Result<WorkflowDefinition, WorkflowError> {
        self.edit_all(workflow_id, std::slice::from_ref(edit))
    }

    /// Apply several edits in order and save once. If any edit fails the
    /// stored workflow is left as it was.
    ///
    /// # Errors
    ///
    /// As for [`edit`](Self::edit).
    pub fn edit_all(
        &self,
        workflow_id: &str,
        edits: &[WorkflowEdit],
    ) -> Result<WorkflowDefinition, WorkflowError> {
        self.ensure_idle(workflow_id)?;
        let mut updated = self
            .store
            .list_workflows()?
            .into_iter()
            .find(|w| w.id == workflow_id)
            .ok_or_else(|| WorkflowError::NotFound(workflow_id.to_string()))?;
        for edit in edits {
            updated = edit.apply(&updated)?;
        }
        self.store.upsert_workflow(updated.clone())?;
        tracing::info!(workflow = workflow_id, ?edits, "workflow edited");
        Ok(updated)
    }
}

fn analyze(state: &RunState, min_corroboration: usize) -> StepResult {
    if state.outcomes.is_empty() {
        return StepResult {
            error: Some("nothing was collected before this step".to_string()),
            ..StepResult::default()
        };
    }
    StepResult {
        summary: Some(summarize(&state.outcomes, &state.sections, min_corroboration)),
        ..StepResult::default()
    }
}

/// Leading section for a titled report.
fn overview(title: &str, sections: &[ReportSection]) -> ReportSection {
    let mut sources: Vec<String> = Vec::new();
    for source in sections.iter().flat_map(|s| s.sources.iter()) {
        if !sources.contains(source) {
            sources.push(source.clone());
        }
    }
    let facts: usize = sections.iter().map(|s| s.facts.len()).sum();
    ReportSection {
        title: title.to_string(),
        topic: Topic::General,
        content: format!(
            "{} section(s), {facts} fact(s) from {} source(s).",
            sections.len(),
            sources.len()
        ),
        facts: Vec::new(),
        visualization: None,
        sources,
        degraded: false,
    }
}

fn log(
    index: usize,
    step: &StepSpec,
    status: StepStatus,
    result: StepResult,
    started_at: DateTime<Utc>,
) -> StepLog {
    if let Some(error) = &result.error {
        tracing::warn!(step = %step.id, kind = step.kind.as_str(), %error, "step failed");
    }
    StepLog {
        step_id: step.id.clone(),
        index,
        status,
        outcomes: result.outcomes,
        summary: result.summary,
        sections: result.sections,
        error: result.error,
        started_at,
        finished_at: Utc::now(),
    }
}
