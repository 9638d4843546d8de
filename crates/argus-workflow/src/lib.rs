//! # argus-workflow
//!
//! Sequences orchestration passes into named workflows.
//!
//! A workflow is an ordered list of `collect`, `analyze` and `report`
//! steps, each optionally guarded by a [`Condition`](argus_core::Condition)
//! over earlier results and carrying a halt/continue failure policy.
//! Executions move `pending → running → succeeded | failed | partial` and
//! are appended to the store's execution log.

pub mod analysis;
pub mod condition;
pub mod edit;
pub mod error;
pub mod pass;
pub mod schedule;
pub mod sequencer;

pub use analysis::summarize;
pub use condition::EvalContext;
pub use edit::WorkflowEdit;
pub use error::{PassError, WorkflowError};
pub use pass::{CollectRequest, OrchestrationPass};
pub use schedule::{is_due, next_due, period};
pub use sequencer::Sequencer;
