//! # argus-core
//!
//! Core types, signal extraction, and the source catalog for Argus.
//!
//! This crate provides the foundational types shared across all Argus crates:
//! - Typed subject signals and the signal extractor
//! - Source descriptors, the three-tier category taxonomy, and catalog snapshots
//! - Query candidates and selection exclusions
//! - Call outcomes (the audit record of every dispatched query)
//! - Parsed facts, report sections, and the investigation report
//! - Workflow definitions, executions, and step logs
//! - ID prefix constants and generation
//! - Cross-cutting error types

pub mod candidate;
pub mod catalog;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod outcome;
pub mod report;
pub mod signal;
pub mod workflow;

pub use candidate::{ExclusionReason, QueryCandidate, RankingSource, SelectionExclusion};
pub use catalog::{
    AuthDescriptor, Catalog, CatalogHandle, Category, FieldHint, ParamBinding, ResponseHint,
    SourceDescriptor,
};
pub use errors::CoreError;
pub use outcome::{CallOutcome, CallStatus, FailureKind, SkipReason};
pub use report::{
    FactKind, FactValue, InvestigationReport, MergedFact, ParsedFact, ReportSection, Topic,
    Visualization,
};
pub use signal::{Signal, SignalSet, SubjectInput};
pub use workflow::{
    AnalysisSummary, Condition, StepKind, StepLog, StepSpec, Trigger, TriggerContext,
    WorkflowDefinition, WorkflowExecution,
};
