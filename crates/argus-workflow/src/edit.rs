//! Explicit edit operations on workflow definitions.
//!
//! Edits produce a new definition and validate it; an edit that would
//! leave the workflow invalid (duplicate step ids, no steps, dangling
//! step references) is rejected and the original is untouched.

use argus_core::enums::WorkflowLevel;
use argus_core::{CoreError, StepSpec, SubjectInput, Trigger, WorkflowDefinition};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEdit {
    Rename(String),
    SetDescription(String),
    SetTrigger(Trigger),
    SetLevel(WorkflowLevel),
    SetSubject(SubjectInput),
    /// Insert a step at `position` (appended when `None`).
    AddStep {
        step: StepSpec,
        position: Option<usize>,
    },
    RemoveStep(String),
    /// Replace the step with the same id.
    ReplaceStep(StepSpec),
}

impl WorkflowEdit {
    /// Apply this edit to a copy of `workflow`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] for an unknown step id and
    /// [`CoreError::Validation`] if the result is not a valid workflow.
    pub fn apply(&self, workflow: &WorkflowDefinition) -> Result<WorkflowDefinition, CoreError> {
        let mut next = workflow.clone();
        match self {
            Self::Rename(name) => {
                if name.trim().is_empty() {
                    return Err(CoreError::Validation(
                        "workflow name must not be empty".to_string(),
                    ));
                }
                next.name.clone_from(name);
            }
            Self::SetDescription(description) => next.description.clone_from(description),
            Self::SetTrigger(trigger) => next.trigger = trigger.clone(),
            Self::SetLevel(level) => next.level = *level,
            Self::SetSubject(subject) => next.subject = subject.clone(),
            Self::AddStep { step, position } => {
                let at = position.unwrap_or(next.steps.len()).min(next.steps.len());
                next.steps.insert(at, step.clone());
            }
            Self::RemoveStep(step_id) => {
                let idx = step_position(&next, step_id)?;
                next.steps.remove(idx);
            }
            Self::ReplaceStep(step) => {
                let idx = step_position(&next, &step.id)?;
                next.steps[idx] = step.clone();
            }
        }
        next.validate()?;
        Ok(next)
    }
}

fn step_position(workflow: &WorkflowDefinition, step_id: &str) -> Result<usize, CoreError> {
    workflow
        .step_index(step_id)
        .ok_or_else(|| CoreError::NotFound {
            entity_type: "step".to_string(),
            id: format!("{}/{step_id}", workflow.id),
        })
}
