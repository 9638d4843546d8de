//! Parsed facts, report sections, and the investigation report.
//!
//! Everything here is produced by the merger and read by presentation
//! layers. Sections are ordered by [`Topic`] declaration order.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::candidate::{RankingSource, SelectionExclusion};
use crate::catalog::Category;
use crate::enums::{Attribute, DataType, EntityType, VisualizationKind};
use crate::outcome::CallOutcome;
use crate::signal::SignalSet;

// ---------------------------------------------------------------------------
// Topic
// ---------------------------------------------------------------------------

/// Report section grouping. Declaration order is section order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Topic {
    Identity,
    Contact,
    Organization,
    Location,
    Network,
    Vehicle,
    Imagery,
    General,
}

impl Topic {
    /// Derive the topic a source's results belong to from its category.
    ///
    /// Rules are checked in order; the first match wins.
    #[must_use]
    pub const fn from_category(category: &Category) -> Self {
        match (category.data_type, category.entity_type, category.attribute) {
            (DataType::Image | DataType::Video, _, _) | (_, _, Attribute::Face) => Self::Imagery,
            (DataType::Location, _, _)
            | (_, EntityType::Address, _)
            | (_, _, Attribute::Coordinates) => Self::Location,
            (DataType::Network, _, _)
            | (_, EntityType::Domain | EntityType::Device, _)
            | (_, _, Attribute::Ip | Attribute::Host | Attribute::Domain | Attribute::Url) => {
                Self::Network
            }
            (_, EntityType::Vehicle, _) | (_, _, Attribute::LicensePlate) => Self::Vehicle,
            (_, _, Attribute::Email | Attribute::Phone) => Self::Contact,
            (_, EntityType::Organization, _) => Self::Organization,
            (_, _, Attribute::Name | Attribute::Username) => Self::Identity,
            _ => Self::General,
        }
    }

    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::Identity => "Identity",
            Self::Contact => "Contact details",
            Self::Organization => "Organizations",
            Self::Location => "Locations",
            Self::Network => "Network footprint",
            Self::Vehicle => "Vehicles",
            Self::Imagery => "Imagery",
            Self::General => "Other findings",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

// ---------------------------------------------------------------------------
// Facts
// ---------------------------------------------------------------------------

/// Shape of a fact value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Text,
    /// A categorical label that can be counted (e.g. breach names, platforms).
    Category,
    Number,
    Flag,
    Coordinates,
    Event,
    Relation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FactValue {
    Text(String),
    Category(String),
    Number(f64),
    Flag(bool),
    Coordinates { lat: f64, lon: f64 },
    Event { date: String, description: String },
    Relation { from: String, to: String, relation: String },
}

impl FactValue {
    #[must_use]
    pub const fn kind(&self) -> FactKind {
        match self {
            Self::Text(_) => FactKind::Text,
            Self::Category(_) => FactKind::Category,
            Self::Number(_) => FactKind::Number,
            Self::Flag(_) => FactKind::Flag,
            Self::Coordinates { .. } => FactKind::Coordinates,
            Self::Event { .. } => FactKind::Event,
            Self::Relation { .. } => FactKind::Relation,
        }
    }

    /// Canonical text form used for corroboration and display.
    #[must_use]
    pub fn normalized(&self) -> String {
        fn squash(s: &str) -> String {
            s.split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        }
        match self {
            Self::Text(s) | Self::Category(s) => squash(s),
            Self::Number(n) => format!("{n}"),
            Self::Flag(b) => b.to_string(),
            // ~11m precision; providers disagree on trailing digits.
            Self::Coordinates { lat, lon } => format!("{lat:.4},{lon:.4}"),
            Self::Event { date, description } => format!("{}|{}", squash(date), squash(description)),
            Self::Relation { from, to, relation } => {
                format!("{}|{}|{}", squash(from), squash(relation), squash(to))
            }
        }
    }
}

impl fmt::Display for FactValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::Category(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
            Self::Flag(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Self::Coordinates { lat, lon } => write!(f, "{lat}, {lon}"),
            Self::Event { date, description } => write!(f, "{date}: {description}"),
            Self::Relation { from, to, relation } => write!(f, "{from} -[{relation}]-> {to}"),
        }
    }
}

/// One normalized fact from one source response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ParsedFact {
    pub label: String,
    #[serde(flatten)]
    pub value: FactValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

impl ParsedFact {
    #[must_use]
    pub fn new(label: impl Into<String>, value: FactValue) -> Self {
        Self {
            label: label.into(),
            value,
            unit: None,
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    #[must_use]
    pub const fn kind(&self) -> FactKind {
        self.value.kind()
    }

    /// Key under which two facts count as the same fact.
    #[must_use]
    pub fn normalized_key(&self) -> String {
        let label = self.label.trim().to_lowercase();
        match &self.unit {
            Some(unit) => format!("{label}={}{}", self.value.normalized(), unit.to_lowercase()),
            None => format!("{label}={}", self.value.normalized()),
        }
    }
}

/// A fact after merging, with the sources that reported it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MergedFact {
    #[serde(flatten)]
    pub fact: ParsedFact,
    /// Contributing source ids in first-seen order.
    pub sources: Vec<String>,
    /// Number of distinct sources reporting this fact.
    pub corroboration: usize,
}

impl MergedFact {
    #[must_use]
    pub const fn is_corroborated(&self) -> bool {
        self.corroboration >= 2
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Visualization hint plus a renderer-ready payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Visualization {
    #[serde(rename = "type")]
    pub kind: VisualizationKind,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ReportSection {
    pub title: String,
    pub topic: Topic,
    /// Short plain-text summary of the section.
    pub content: String,
    pub facts: Vec<MergedFact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<Visualization>,
    /// Source ids that contributed successful outcomes to this section.
    pub sources: Vec<String>,
    /// Set when a response in this section could not be normalized.
    #[serde(default)]
    pub degraded: bool,
}

// ---------------------------------------------------------------------------
// InvestigationReport
// ---------------------------------------------------------------------------

/// Everything one orchestration pass produced. The engine never renders it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct InvestigationReport {
    pub id: String,
    pub generated_at: DateTime<Utc>,
    pub signals: SignalSet,
    pub sections: Vec<ReportSection>,
    pub outcomes: Vec<CallOutcome>,
    pub exclusions: Vec<SelectionExclusion>,
    pub ranking: RankingSource,
    /// Candidates dropped by the selection limit.
    #[serde(default)]
    pub truncated: usize,
}

impl InvestigationReport {
    #[must_use]
    pub fn succeeded_calls(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    #[must_use]
    pub fn failed_calls(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failure()).count()
    }

    #[must_use]
    pub fn skipped_calls(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn facts(&self) -> impl Iterator<Item = &MergedFact> {
        self.sections.iter().flat_map(|s| s.facts.iter())
    }

    /// Facts reported by at least `min` distinct sources.
    #[must_use]
    pub fn corroborated_facts(&self, min: usize) -> usize {
        self.facts().filter(|f| f.corroboration >= min).count()
    }
}
