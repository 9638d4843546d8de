//! Outcome merging: normalization, corroboration, section assembly.

use std::collections::{BTreeMap, HashMap};

use argus_core::{
    CallOutcome, CallStatus, Catalog, MergedFact, ReportSection, ResponseHint, Topic,
};
use serde_json::Value;

use crate::adapters::AdapterRegistry;
use crate::visual::{bullet, bullet_list, visualize};

/// Title of the section emitted when no call succeeded.
pub const NO_DATA_TITLE: &str = "No data retrieved";

/// Longest raw payload excerpt kept in a degraded section.
const MAX_RAW_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct Merger {
    adapters: AdapterRegistry,
}

impl Default for Merger {
    fn default() -> Self {
        Self::new(AdapterRegistry::with_builtin())
    }
}

/// Accumulates one topic's facts while outcomes are folded in.
#[derive(Default)]
struct SectionBuilder {
    facts: Vec<MergedFact>,
    sources: Vec<String>,
    raw: Vec<String>,
}

impl SectionBuilder {
    fn add_source(&mut self, source_id: &str) {
        if !self.sources.iter().any(|s| s == source_id) {
            self.sources.push(source_id.to_string());
        }
    }

    fn build(self, topic: Topic) -> ReportSection {
        let degraded = !self.raw.is_empty();
        let corroborated = self.facts.iter().filter(|f| f.is_corroborated()).count();
        let mut content = format!(
            "{} fact{} from {} source{}, {corroborated} corroborated.",
            self.facts.len(),
            plural(self.facts.len()),
            self.sources.len(),
            plural(self.sources.len()),
        );
        let visualization = if degraded {
            content.push_str(" Some responses could not be normalized; raw values are included.");
            let mut items: Vec<String> = self.facts.iter().map(bullet).collect();
            items.extend(self.raw);
            bullet_list(items)
        } else {
            visualize(&self.facts)
        };
        ReportSection {
            title: topic.title().to_string(),
            topic,
            content,
            facts: self.facts,
            visualization: Some(visualization),
            sources: self.sources,
            degraded,
        }
    }
}

impl Merger {
    #[must_use]
    pub const fn new(adapters: AdapterRegistry) -> Self {
        Self { adapters }
    }

    #[must_use]
    pub const fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Merge outcomes into report sections, one per topic in topic order.
    ///
    /// Only successful outcomes contribute. When none succeeded, a single
    /// "no data" section is returned. Never fails: a response that cannot be
    /// normalized degrades its section instead.
    #[must_use]
    pub fn merge(&self, catalog: &Catalog, outcomes: &[CallOutcome]) -> Vec<ReportSection> {
        let default_hint = ResponseHint::default();
        let mut topics: BTreeMap<Topic, SectionBuilder> = BTreeMap::new();
        // A fact lives in the section of the first source that reported it.
        let mut seen: HashMap<String, (Topic, usize)> = HashMap::new();

        for outcome in outcomes.iter().filter(|o| o.is_success()) {
            let source_id = outcome.source_id.as_str();
            let (topic, hint) = match catalog.get(source_id) {
                Some(source) => (Topic::from_category(&source.category), &source.response_hint),
                None => {
                    tracing::warn!(source = source_id, "outcome for source missing from catalog");
                    (Topic::General, &default_hint)
                }
            };
            topics.entry(topic).or_default().add_source(source_id);

            let raw = outcome.raw_payload.as_ref().unwrap_or(&Value::Null);
            let facts = match self.adapters.adapter_for(source_id).normalize(raw, hint) {
                Ok(facts) => facts,
                Err(e) => {
                    tracing::warn!(source = source_id, %e, "response degraded to raw values");
                    topics
                        .entry(topic)
                        .or_default()
                        .raw
                        .push(format!("{source_id} (raw): {}", excerpt(raw)));
                    continue;
                }
            };
            tracing::debug!(source = source_id, facts = facts.len(), "normalized response");

            for fact in facts {
                let key = fact.normalized_key();
                if let Some(&(home, idx)) = seen.get(&key) {
                    if let Some(merged) = topics.get_mut(&home).and_then(|b| b.facts.get_mut(idx)) {
                        corroborate(merged, source_id);
                    }
                    continue;
                }
                let builder = topics.entry(topic).or_default();
                seen.insert(key, (topic, builder.facts.len()));
                builder.facts.push(MergedFact {
                    fact,
                    sources: vec![source_id.to_string()],
                    corroboration: 1,
                });
            }
        }

        if topics.is_empty() {
            return vec![no_data_section(outcomes)];
        }
        topics
            .into_iter()
            .map(|(topic, builder)| builder.build(topic))
            .collect()
    }
}

fn corroborate(merged: &mut MergedFact, source_id: &str) {
    if !merged.sources.iter().any(|s| s == source_id) {
        merged.sources.push(source_id.to_string());
        merged.corroboration = merged.sources.len();
    }
}

fn no_data_section(outcomes: &[CallOutcome]) -> ReportSection {
    let content = if outcomes.is_empty() {
        "No sources were queried for the given signals.".to_string()
    } else {
        format!(
            "None of the {} queried source{} returned data.",
            outcomes.len(),
            plural(outcomes.len())
        )
    };
    let items = outcomes
        .iter()
        .map(|o| match &o.status {
            CallStatus::Failure { message, .. } => {
                format!("{}: {} ({message})", o.source_id, o.status)
            }
            status => format!("{}: {status}", o.source_id),
        })
        .collect();
    ReportSection {
        title: NO_DATA_TITLE.to_string(),
        topic: Topic::General,
        content,
        facts: Vec::new(),
        visualization: Some(bullet_list(items)),
        sources: Vec::new(),
        degraded: false,
    }
}

fn excerpt(raw: &Value) -> String {
    let text = raw.to_string();
    if text.chars().count() <= MAX_RAW_CHARS {
        return text;
    }
    let mut cut: String = text.chars().take(MAX_RAW_CHARS).collect();
    cut.push('…');
    cut
}

const fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
