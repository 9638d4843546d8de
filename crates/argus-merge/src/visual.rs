//! Visualization selection from the shape of a section's facts.
//!
//! First match wins: any coordinates → map; any relations → network graph;
//! any dated events → timeline; two or more categorical facts → pie chart
//! (at most six distinct categories) or bar chart; otherwise bullet list.

use argus_core::enums::VisualizationKind;
use argus_core::{FactKind, FactValue, MergedFact, Visualization};
use serde_json::{Value, json};

/// Above this many distinct categories a pie chart becomes a bar chart.
const MAX_PIE_CATEGORIES: usize = 6;

#[must_use]
pub fn visualize(facts: &[MergedFact]) -> Visualization {
    let has = |kind: FactKind| facts.iter().any(|f| f.fact.kind() == kind);

    if has(FactKind::Coordinates) {
        return map(facts);
    }
    if has(FactKind::Relation) {
        return network(facts);
    }
    if has(FactKind::Event) {
        return timeline(facts);
    }
    let categories = facts
        .iter()
        .filter(|f| f.fact.kind() == FactKind::Category)
        .count();
    if categories >= 2 {
        return counts(facts);
    }
    bullet_list(facts.iter().map(bullet).collect())
}

#[must_use]
pub fn bullet_list(items: Vec<String>) -> Visualization {
    Visualization {
        kind: VisualizationKind::BulletList,
        payload: json!({ "items": items }),
    }
}

/// One display line for a merged fact.
#[must_use]
pub fn bullet(fact: &MergedFact) -> String {
    let unit = fact.fact.unit.as_deref().unwrap_or("");
    let mut line = format!("{}: {}{unit}", fact.fact.label, fact.fact.value);
    if fact.is_corroborated() {
        line.push_str(&format!(" ({} sources)", fact.corroboration));
    }
    line
}

fn map(facts: &[MergedFact]) -> Visualization {
    let locations: Vec<Value> = facts
        .iter()
        .filter_map(|f| match f.fact.value {
            FactValue::Coordinates { lat, lon } => Some(json!({
                "label": f.fact.label,
                "lat": lat,
                "lon": lon,
                "sources": f.sources,
            })),
            _ => None,
        })
        .collect();
    Visualization {
        kind: VisualizationKind::Map,
        payload: json!({ "locations": locations }),
    }
}

fn network(facts: &[MergedFact]) -> Visualization {
    let mut nodes: Vec<&str> = Vec::new();
    let mut edges = Vec::new();
    for fact in facts {
        if let FactValue::Relation { from, to, relation } = &fact.fact.value {
            for node in [from.as_str(), to.as_str()] {
                if !nodes.contains(&node) {
                    nodes.push(node);
                }
            }
            edges.push(json!({ "from": from, "to": to, "relation": relation }));
        }
    }
    let nodes: Vec<Value> = nodes.into_iter().map(|id| json!({ "id": id })).collect();
    Visualization {
        kind: VisualizationKind::NetworkGraph,
        payload: json!({ "nodes": nodes, "edges": edges }),
    }
}

fn timeline(facts: &[MergedFact]) -> Visualization {
    let mut events: Vec<(&str, &str, &str)> = facts
        .iter()
        .filter_map(|f| match &f.fact.value {
            FactValue::Event { date, description } => {
                Some((date.as_str(), description.as_str(), f.fact.label.as_str()))
            }
            _ => None,
        })
        .collect();
    events.sort_by(|a, b| a.0.cmp(b.0));
    let events: Vec<Value> = events
        .into_iter()
        .map(|(date, description, label)| {
            json!({ "date": date, "description": description, "label": label })
        })
        .collect();
    Visualization {
        kind: VisualizationKind::Timeline,
        payload: json!({ "events": events }),
    }
}

/// Category counts, weighted by how many sources reported each category.
fn counts(facts: &[MergedFact]) -> Visualization {
    let mut tally: Vec<(String, usize)> = Vec::new();
    for fact in facts {
        if let FactValue::Category(name) = &fact.fact.value {
            match tally.iter_mut().find(|(n, _)| n.eq_ignore_ascii_case(name)) {
                Some((_, count)) => *count += fact.corroboration,
                None => tally.push((name.clone(), fact.corroboration)),
            }
        }
    }
    tally.sort_by(|a, b| b.1.cmp(&a.1));

    let kind = if tally.len() <= MAX_PIE_CATEGORIES {
        VisualizationKind::PieChart
    } else {
        VisualizationKind::BarChart
    };
    let (categories, values): (Vec<String>, Vec<usize>) = tally.into_iter().unzip();
    Visualization {
        kind,
        payload: json!({ "categories": categories, "values": values }),
    }
}
