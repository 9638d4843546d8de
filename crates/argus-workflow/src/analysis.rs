//! Analyze-step summaries.

use argus_core::{AnalysisSummary, CallOutcome, ReportSection, Topic};

/// Deterministic summary of everything collected so far.
#[must_use]
pub fn summarize(
    outcomes: &[CallOutcome],
    sections: &[ReportSection],
    min_corroboration: usize,
) -> AnalysisSummary {
    let facts = sections.iter().flat_map(|s| s.facts.iter());
    let mut topics: Vec<Topic> = sections
        .iter()
        .filter(|s| !s.facts.is_empty())
        .map(|s| s.topic)
        .collect();
    topics.sort_unstable();
    topics.dedup();

    AnalysisSummary {
        succeeded_calls: outcomes.iter().filter(|o| o.is_success()).count(),
        failed_calls: outcomes.iter().filter(|o| o.is_failure()).count(),
        skipped_calls: outcomes.iter().filter(|o| o.is_skipped()).count(),
        facts: facts.clone().count(),
        corroborated_facts: facts
            .filter(|f| f.corroboration >= min_corroboration)
            .count(),
        min_corroboration,
        topics,
    }
}
