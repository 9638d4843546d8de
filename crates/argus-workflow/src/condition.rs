//! Step condition evaluation.

use std::collections::HashMap;

use argus_core::enums::StepStatus;
use argus_core::{CallOutcome, Condition, ReportSection, SignalSet};

/// Minimum distinct sources for a fact to count as corroborated.
pub const CORROBORATION_THRESHOLD: usize = 2;

/// Everything a condition may look at: the execution's signals and what
/// earlier steps produced.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub signals: &'a SignalSet,
    pub outcomes: &'a [CallOutcome],
    pub sections: &'a [ReportSection],
    pub step_status: &'a HashMap<String, StepStatus>,
}

impl EvalContext<'_> {
    #[must_use]
    pub fn evaluate(&self, condition: &Condition) -> bool {
        match condition {
            Condition::SignalPresent(kind) => self.signals.has_present(*kind),
            Condition::SucceededCallsAtLeast(n) => {
                self.outcomes.iter().filter(|o| o.is_success()).count() >= *n
            }
            Condition::FailedCallsAtLeast(n) => {
                self.outcomes.iter().filter(|o| o.is_failure()).count() >= *n
            }
            Condition::CorroboratedFactsAtLeast(n) => {
                self.sections
                    .iter()
                    .flat_map(|s| s.facts.iter())
                    .filter(|f| f.corroboration >= CORROBORATION_THRESHOLD)
                    .count()
                    >= *n
            }
            Condition::StepSucceeded(step_id) => {
                self.step_status.get(step_id) == Some(&StepStatus::Succeeded)
            }
            Condition::All(items) => items.iter().all(|c| self.evaluate(c)),
            Condition::Any(items) => items.iter().any(|c| self.evaluate(c)),
            Condition::Not(inner) => !self.evaluate(inner),
        }
    }
}
