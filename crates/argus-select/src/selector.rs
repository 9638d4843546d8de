//! Candidate selection and ranking.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;

use argus_config::SelectorConfig;
use argus_core::{
    Catalog, ExclusionReason, QueryCandidate, RankingSource, SelectionExclusion, Signal,
    SignalSet, SourceDescriptor,
};
use serde::{Deserialize, Serialize};

use crate::{OracleError, RankingOracle, RankingRequest, RankingResponse};

/// Result of one selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    /// Ranked, de-duplicated, at most `limit` long.
    pub candidates: Vec<QueryCandidate>,
    /// Sources that matched a present signal but could not be bound.
    pub exclusions: Vec<SelectionExclusion>,
    /// Candidates dropped by the limit.
    pub truncated: usize,
    pub ranking: RankingSource,
}

#[derive(Debug, Clone)]
pub struct SelectorOptions {
    pub limit: usize,
    pub oracle_weight: f64,
    pub unranked_confidence: f64,
    /// When set, only these source ids are considered.
    pub only_sources: Option<Vec<String>>,
    pub oracle_timeout: Duration,
}

impl SelectorOptions {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_config(config: &SelectorConfig) -> Self {
        Self {
            limit: config.default_limit,
            oracle_weight: config.oracle_weight,
            unranked_confidence: config.unranked_confidence,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn with_only_sources(mut self, sources: Option<Vec<String>>) -> Self {
        self.only_sources = sources;
        self
    }

    #[must_use]
    pub const fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }
}

impl Default for SelectorOptions {
    fn default() -> Self {
        let config = SelectorConfig::default();
        Self {
            limit: config.default_limit,
            oracle_weight: config.oracle_weight,
            unranked_confidence: config.unranked_confidence,
            only_sources: None,
            oracle_timeout: Duration::from_secs(5),
        }
    }
}

/// A candidate plus the keys it is ordered by.
#[derive(Debug, Clone)]
struct Ranked {
    candidate: QueryCandidate,
    priority: i32,
    catalog_index: usize,
    signal_index: usize,
}

fn deterministic_order(a: &Ranked, b: &Ranked) -> Ordering {
    b.candidate
        .match_tiers
        .cmp(&a.candidate.match_tiers)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.catalog_index.cmp(&b.catalog_index))
        .then_with(|| a.signal_index.cmp(&b.signal_index))
}

fn scored_order(a: &Ranked, b: &Ranked) -> Ordering {
    b.candidate
        .priority_score
        .total_cmp(&a.candidate.priority_score)
        .then_with(|| deterministic_order(a, b))
}

/// Bind every parameter of `source`, driven by `signal`.
///
/// Parameters bound to the driving signal's kind take its value; other
/// parameters take the first present signal of their kind.
fn bind(
    source: &SourceDescriptor,
    signal: &Signal,
    signals: &SignalSet,
) -> Result<BTreeMap<String, String>, ExclusionReason> {
    if source.bindings_for(signal.kind).next().is_none() {
        return Err(ExclusionReason::NoParamForSignal);
    }
    let mut params = BTreeMap::new();
    for binding in &source.param_mapping {
        let value = if binding.signal == signal.kind {
            Some(signal.value.as_str())
        } else {
            signals
                .first_present(binding.signal)
                .map(|s| s.value.as_str())
        };
        match value {
            Some(value) => {
                params.insert(binding.param.clone(), value.to_string());
            }
            None if binding.required => {
                return Err(ExclusionReason::MissingRequiredSignal {
                    param: binding.param.clone(),
                    signal: binding.signal,
                });
            }
            None => {}
        }
    }
    Ok(params)
}

/// Every bindable (source, signal) pair, sorted deterministically and
/// de-duplicated, plus the exclusions.
fn collect(
    signals: &SignalSet,
    catalog: &Catalog,
    only: Option<&[String]>,
) -> (Vec<Ranked>, Vec<SelectionExclusion>) {
    let present: Vec<&Signal> = signals.present().collect();
    let mut pool = Vec::new();
    let mut exclusions = Vec::new();

    for (catalog_index, source) in catalog.iter().enumerate() {
        if only.is_some_and(|ids| !ids.iter().any(|id| *id == source.id)) {
            continue;
        }

        let mut produced = false;
        let mut first_miss: Option<(&Signal, ExclusionReason)> = None;

        for (signal_index, signal) in present.iter().enumerate() {
            let tiers = source.category.matching_tiers(&signal.kind.profile());
            if tiers == 0 {
                continue;
            }
            match bind(source, signal, signals) {
                Ok(bound_params) => {
                    produced = true;
                    pool.push(Ranked {
                        candidate: QueryCandidate {
                            source_id: source.id.clone(),
                            signal: signal.kind,
                            bound_params,
                            match_tiers: tiers,
                            priority_score: f64::from(tiers),
                        },
                        priority: source.priority,
                        catalog_index,
                        signal_index,
                    });
                }
                Err(reason) => {
                    if first_miss.is_none() {
                        first_miss = Some((signal, reason));
                    }
                }
            }
        }

        if !produced {
            if let Some((signal, reason)) = first_miss {
                tracing::debug!(
                    source = %source.id,
                    signal = %signal.kind,
                    ?reason,
                    "source matched but could not be bound"
                );
                exclusions.push(SelectionExclusion {
                    source_id: source.id.clone(),
                    signal: signal.kind,
                    reason,
                });
            }
        }
    }

    pool.sort_by(deterministic_order);
    let mut seen = HashSet::new();
    pool.retain(|r| seen.insert((r.candidate.source_id.clone(), r.candidate.bound_params.clone())));

    (pool, exclusions)
}

fn finish(
    mut pool: Vec<Ranked>,
    exclusions: Vec<SelectionExclusion>,
    limit: usize,
    ranking: RankingSource,
) -> Selection {
    let truncated = pool.len().saturating_sub(limit);
    if truncated > 0 {
        tracing::info!(
            kept = limit,
            dropped = truncated,
            "candidate list truncated by limit"
        );
    }
    pool.truncate(limit);
    Selection {
        candidates: pool.into_iter().map(|r| r.candidate).collect(),
        exclusions,
        truncated,
        ranking,
    }
}

/// Deterministic selection of at most `limit` candidates.
///
/// An empty signal set yields an empty selection.
#[must_use]
pub fn select(signals: &SignalSet, catalog: &Catalog, limit: usize) -> Selection {
    select_with(signals, catalog, &SelectorOptions::new(limit))
}

/// Deterministic selection honoring every option except the oracle.
#[must_use]
pub fn select_with(signals: &SignalSet, catalog: &Catalog, options: &SelectorOptions) -> Selection {
    let (pool, exclusions) = collect(signals, catalog, options.only_sources.as_deref());
    tracing::debug!(
        present = signals.present().count(),
        sources = catalog.len(),
        candidates = pool.len(),
        excluded = exclusions.len(),
        "selection computed"
    );
    finish(pool, exclusions, options.limit, RankingSource::Deterministic)
}

/// Check a ranking and turn it into a confidence per source id.
fn confidences(
    response: &RankingResponse,
    pool: &[Ranked],
) -> Result<HashMap<String, f64>, OracleError> {
    if response.ranking.is_empty() {
        return Err(OracleError::Malformed("empty ranking".to_string()));
    }
    let known: HashSet<&str> = pool.iter().map(|r| r.candidate.source_id.as_str()).collect();
    let mut map = HashMap::new();
    for entry in &response.ranking {
        if !entry.confidence.is_finite() || !(0.0..=1.0).contains(&entry.confidence) {
            return Err(OracleError::Malformed(format!(
                "confidence {} for '{}' is outside 0.0..=1.0",
                entry.confidence, entry.source_id
            )));
        }
        if map.insert(entry.source_id.clone(), entry.confidence).is_some() {
            return Err(OracleError::Malformed(format!(
                "'{}' ranked twice",
                entry.source_id
            )));
        }
        if !known.contains(entry.source_id.as_str()) {
            tracing::debug!(source = %entry.source_id, "oracle ranked an unknown source");
        }
    }
    Ok(map)
}

/// Selection with an optional ranking oracle.
///
/// Candidates are re-scored as `tiers * ((1 - w) + w * confidence)`.
/// Sources the oracle did not rank use `unranked_confidence`. Any oracle
/// error, timeout, or malformed answer yields exactly the deterministic
/// selection, marked [`RankingSource::Fallback`].
pub async fn select_ranked(
    signals: &SignalSet,
    catalog: &Catalog,
    options: &SelectorOptions,
    oracle: Option<&dyn RankingOracle>,
) -> Selection {
    let Some(oracle) = oracle else {
        return select_with(signals, catalog, options);
    };

    let (mut pool, exclusions) = collect(signals, catalog, options.only_sources.as_deref());
    if pool.is_empty() {
        return finish(pool, exclusions, options.limit, RankingSource::Deterministic);
    }

    let request = RankingRequest {
        signals: signals.present().cloned().collect(),
        candidates: pool.iter().map(|r| r.candidate.clone()).collect(),
    };

    let answer = match tokio::time::timeout(options.oracle_timeout, oracle.rank(&request)).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(options.oracle_timeout.as_millis())),
    };
    let confidences = answer.and_then(|response| confidences(&response, &pool));

    match confidences {
        Ok(confidences) => {
            let w = options.oracle_weight.clamp(0.0, 1.0);
            for ranked in &mut pool {
                let confidence = confidences
                    .get(&ranked.candidate.source_id)
                    .copied()
                    .unwrap_or(options.unranked_confidence);
                ranked.candidate.priority_score =
                    f64::from(ranked.candidate.match_tiers) * w.mul_add(confidence, 1.0 - w);
            }
            pool.sort_by(scored_order);
            tracing::debug!(ranked = confidences.len(), "oracle ranking applied");
            finish(pool, exclusions, options.limit, RankingSource::Oracle)
        }
        Err(error) => {
            tracing::warn!(%error, "ranking oracle unavailable, using deterministic order");
            finish(
                pool,
                exclusions,
                options.limit,
                RankingSource::Fallback {
                    reason: error.to_string(),
                },
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argus_core::enums::{Attribute, DataType, EntityType, HttpMethod, SignalKind};
    use argus_core::{AuthDescriptor, Category, ParamBinding, ResponseHint};
    use pretty_assertions::assert_eq;

    fn source(id: &str, category: Category, bindings: &[(&str, SignalKind, bool)]) -> SourceDescriptor {
        SourceDescriptor {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            category,
            endpoint_template: "https://example.test/lookup".to_string(),
            http_method: HttpMethod::Get,
            auth: AuthDescriptor::None,
            param_mapping: bindings
                .iter()
                .map(|(param, signal, required)| ParamBinding {
                    param: (*param).to_string(),
                    signal: *signal,
                    required: *required,
                })
                .collect(),
            static_params: BTreeMap::new(),
            headers: BTreeMap::new(),
            response_hint: ResponseHint::default(),
            priority: 0,
        }
    }

    fn person(attribute: Attribute) -> Category {
        Category::new(DataType::Text, EntityType::Person, attribute)
    }

    #[test]
    fn bind_fills_secondary_params_from_other_signals() {
        let s = source(
            "hunter-finder",
            person(Attribute::Name),
            &[("full_name", SignalKind::Name, true), ("domain", SignalKind::FreeText, false)],
        );
        let signals = SignalSet::new(vec![Signal::present(SignalKind::Name, "Jane Doe")]);
        let params = bind(&s, &signals.all()[0], &signals).unwrap();
        assert_eq!(params.len(), 1);
        assert_eq!(params["full_name"], "Jane Doe");
    }

    #[test]
    fn bind_reports_missing_required_signal() {
        let s = source(
            "needs-both",
            person(Attribute::Name),
            &[("name", SignalKind::Name, true), ("city", SignalKind::Location, true)],
        );
        let signals = SignalSet::new(vec![Signal::present(SignalKind::Name, "Jane Doe")]);
        let err = bind(&s, &signals.all()[0], &signals).unwrap_err();
        assert_eq!(
            err,
            ExclusionReason::MissingRequiredSignal {
                param: "city".to_string(),
                signal: SignalKind::Location
            }
        );
    }

    #[test]
    fn same_params_via_two_signals_collapse() {
        let s = source(
            "combo",
            person(Attribute::Email),
            &[("email", SignalKind::Email, true), ("name", SignalKind::Name, true)],
        );
        let catalog = Catalog::new(vec![s]).unwrap();
        let signals = SignalSet::new(vec![
            Signal::present(SignalKind::Name, "Jane Doe"),
            Signal::present(SignalKind::Email, "jane@example.com"),
        ]);
        let selection = select(&signals, &catalog, 10);
        assert_eq!(selection.candidates.len(), 1);
        // The email-driven copy matches all three tiers and wins the sort.
        assert_eq!(selection.candidates[0].signal, SignalKind::Email);
        assert_eq!(selection.candidates[0].match_tiers, 3);
    }

    #[test]
    fn only_sources_filters_catalog() {
        let catalog = Catalog::new(vec![
            source("a", person(Attribute::Name), &[("q", SignalKind::Name, true)]),
            source("b", person(Attribute::Name), &[("q", SignalKind::Name, true)]),
        ])
        .unwrap();
        let signals = SignalSet::new(vec![Signal::present(SignalKind::Name, "Jane Doe")]);
        let options = SelectorOptions::new(10).with_only_sources(Some(vec!["b".to_string()]));
        let selection = select_with(&signals, &catalog, &options);
        let ids: Vec<&str> = selection.candidates.iter().map(|c| c.source_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }
}
