//! Workflow definitions, executions, and step logs.
//!
//! The sequencer in `argus-workflow` owns the behaviour; this module holds
//! the records it reads and writes.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::{
    ExecutionStatus, FailurePolicy, Frequency, SignalKind, StepStatus, WorkflowLevel,
};
use crate::errors::CoreError;
use crate::outcome::CallOutcome;
use crate::report::{ReportSection, Topic};
use crate::signal::SubjectInput;

// ---------------------------------------------------------------------------
// Conditions
// ---------------------------------------------------------------------------

/// Predicate over the outputs of earlier steps in the same execution.
///
/// ```toml
/// when = { any = [{ succeeded_calls_at_least = 1 }, { signal_present = "email" }] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    SignalPresent(SignalKind),
    SucceededCallsAtLeast(usize),
    FailedCallsAtLeast(usize),
    CorroboratedFactsAtLeast(usize),
    StepSucceeded(String),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Step ids this condition refers to, depth first.
    #[must_use]
    pub fn referenced_steps(&self) -> Vec<&str> {
        match self {
            Self::StepSucceeded(id) => vec![id.as_str()],
            Self::All(items) | Self::Any(items) => {
                items.iter().flat_map(Self::referenced_steps).collect()
            }
            Self::Not(inner) => inner.referenced_steps(),
            Self::SignalPresent(_)
            | Self::SucceededCallsAtLeast(_)
            | Self::FailedCallsAtLeast(_)
            | Self::CorroboratedFactsAtLeast(_) => Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

const fn default_min_corroboration() -> usize {
    2
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StepKind {
    /// One orchestration pass: select, dispatch, and merge.
    Collect {
        #[serde(default)]
        limit: Option<usize>,
        /// Restrict selection to these source ids.
        #[serde(default)]
        sources: Option<Vec<String>>,
    },
    /// Summarize everything collected so far.
    Analyze {
        #[serde(default = "default_min_corroboration")]
        min_corroboration: usize,
    },
    /// Assemble report sections from everything collected so far.
    Report {
        #[serde(default)]
        title: Option<String>,
    },
}

impl StepKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Collect { .. } => "collect",
            Self::Analyze { .. } => "analyze",
            Self::Report { .. } => "report",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StepSpec {
    pub id: String,
    #[serde(flatten)]
    pub kind: StepKind,
    /// Step is skipped when this evaluates to false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

// ---------------------------------------------------------------------------
// Triggers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    #[default]
    Manual,
    /// Runs every `interval` units of `frequency`.
    Scheduled { frequency: Frequency, interval: u32 },
    /// Runs when the named event fires (e.g. `new_case`).
    Event { name: String },
}

impl Trigger {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Scheduled { .. } => "scheduled",
            Self::Event { .. } => "event",
        }
    }
}

/// What started an execution, plus the subject to investigate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TriggerContext {
    pub trigger: Trigger,
    /// Overrides the workflow's stored subject when set.
    #[serde(default)]
    pub subject: Option<SubjectInput>,
    pub fired_at: DateTime<Utc>,
}

impl TriggerContext {
    #[must_use]
    pub fn manual(subject: Option<SubjectInput>) -> Self {
        Self {
            trigger: Trigger::Manual,
            subject,
            fired_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub trigger: Trigger,
    #[serde(default)]
    pub level: WorkflowLevel,
    /// Subject used when the trigger supplies none (scheduled runs).
    #[serde(default)]
    pub subject: SubjectInput,
    #[serde(rename = "step")]
    pub steps: Vec<StepSpec>,
}

impl WorkflowDefinition {
    #[must_use]
    pub fn step_index(&self, step_id: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.id == step_id)
    }

    /// Validate the definition's shape.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the first problem found.
    pub fn validate(&self) -> Result<(), CoreError> {
        let invalid =
            |msg: String| Err(CoreError::Validation(format!("workflow '{}': {msg}", self.id)));

        if self.id.trim().is_empty() {
            return invalid("id must not be empty".to_string());
        }
        if self.steps.is_empty() {
            return invalid("must have at least one step".to_string());
        }

        let mut earlier: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return invalid("step id must not be empty".to_string());
            }
            if let Some(condition) = &step.when {
                for referenced in condition.referenced_steps() {
                    if !earlier.contains(referenced) {
                        return invalid(format!(
                            "step '{}' depends on '{referenced}', which does not run before it",
                            step.id
                        ));
                    }
                }
            }
            if !earlier.insert(step.id.as_str()) {
                return invalid(format!("duplicate step id '{}'", step.id));
            }
        }

        match &self.trigger {
            Trigger::Scheduled { interval: 0, .. } => {
                invalid("schedule interval must be at least 1".to_string())
            }
            Trigger::Event { name } if name.trim().is_empty() => {
                invalid("event name must not be empty".to_string())
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Execution records
// ---------------------------------------------------------------------------

/// Deterministic summary produced by an analyze step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisSummary {
    pub succeeded_calls: usize,
    pub failed_calls: usize,
    pub skipped_calls: usize,
    pub facts: usize,
    /// Facts reported by at least `min_corroboration` sources.
    pub corroborated_facts: usize,
    pub min_corroboration: usize,
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StepLog {
    pub step_id: String,
    pub index: usize,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcomes: Vec<CallOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<AnalysisSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<ReportSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct WorkflowExecution {
    pub id: String,
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub trigger: Trigger,
    pub step_logs: Vec<StepLog>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl WorkflowExecution {
    #[must_use]
    pub fn new(id: String, workflow_id: String, trigger: Trigger) -> Self {
        Self {
            id,
            workflow_id,
            status: ExecutionStatus::Pending,
            trigger,
            step_logs: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Move to `next`, stamping `finished_at` on terminal states.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] if the state machine forbids it.
    pub fn transition(&mut self, next: ExecutionStatus) -> Result<(), CoreError> {
        if !self.status.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                entity_type: "execution".to_string(),
                id: self.id.clone(),
                from: self.status.to_string(),
                to: next.to_string(),
            });
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(Utc::now());
        }
        Ok(())
    }

    /// Append a step log. Logs must arrive in strictly increasing index order
    /// and only while the execution is running.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the log is out of order or the
    /// execution is not running.
    pub fn push_log(&mut self, log: StepLog) -> Result<(), CoreError> {
        if self.status != ExecutionStatus::Running {
            return Err(CoreError::Validation(format!(
                "execution {} is {}, cannot record step '{}'",
                self.id, self.status, log.step_id
            )));
        }
        if let Some(last) = self.step_logs.last() {
            if log.index <= last.index {
                return Err(CoreError::Validation(format!(
                    "step index {} does not follow {}",
                    log.index, last.index
                )));
            }
        }
        self.step_logs.push(log);
        Ok(())
    }

    /// Whether any recorded step failed.
    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.step_logs.iter().any(|l| l.status == StepStatus::Failed)
    }
}
