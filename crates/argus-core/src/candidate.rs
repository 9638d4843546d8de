//! Query candidates and selection bookkeeping.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::enums::SignalKind;

/// A source selected and parameter-bound for querying in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QueryCandidate {
    pub source_id: String,
    /// The signal that pulled this source into the selection.
    pub signal: SignalKind,
    /// Request parameters, keyed by parameter name.
    pub bound_params: BTreeMap<String, String>,
    /// Number of category tiers (1-3) the source shares with the signal profile.
    pub match_tiers: u8,
    /// Ranking score; equals `match_tiers` unless an oracle re-scored it.
    pub priority_score: f64,
}

impl QueryCandidate {
    /// Identity used for de-duplication: same source with the same params.
    #[must_use]
    pub fn dedup_key(&self) -> (&str, &BTreeMap<String, String>) {
        (&self.source_id, &self.bound_params)
    }
}

/// Why a matching source produced no candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The source has no parameter bound to any present signal it matched.
    NoParamForSignal,
    /// A required parameter is bound to a signal kind that is not present.
    MissingRequiredSignal { param: String, signal: SignalKind },
}

/// A source that matched the input but could not be queried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SelectionExclusion {
    pub source_id: String,
    /// The present signal the source matched.
    pub signal: SignalKind,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

/// How the final candidate order was produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RankingSource {
    /// No oracle configured.
    #[default]
    Deterministic,
    /// Scores were blended with oracle confidences.
    Oracle,
    /// An oracle was configured but gave no usable opinion.
    Fallback { reason: String },
}

impl RankingSource {
    #[must_use]
    pub const fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}
