//! # argus-engine
//!
//! The Intelligence Orchestration Engine. One [`Engine::investigate`] call
//! extracts signals from a subject, selects sources from a catalog
//! snapshot, dispatches the queries and merges the responses into an
//! [`InvestigationReport`](argus_core::InvestigationReport).
//!
//! [`Engine`] also implements
//! [`OrchestrationPass`](argus_workflow::OrchestrationPass), so a
//! [`Sequencer`](argus_workflow::Sequencer) can run it as the collect step
//! of a workflow.

mod engine;
mod error;

pub use engine::{Engine, InvestigateOptions, Plan};
pub use error::EngineError;
