//! OpenCorporates officer search.
//!
//! Each officer record becomes a relation `person -[position]-> company`,
//! plus an appointment event when a start date is present.

use argus_core::{FactValue, ParsedFact, ResponseHint};
use serde_json::Value;

use super::Adapter;
use crate::error::{NormalizeError, describe};

const OFFICERS_POINTER: &str = "/results/officers";

#[derive(Debug, Clone, Copy, Default)]
pub struct OfficerAdapter;

impl Adapter for OfficerAdapter {
    fn normalize(
        &self,
        raw: &Value,
        _hint: &ResponseHint,
    ) -> Result<Vec<ParsedFact>, NormalizeError> {
        let officers = raw
            .pointer(OFFICERS_POINTER)
            .ok_or_else(|| NormalizeError::MissingRoot {
                pointer: OFFICERS_POINTER.to_string(),
            })?;
        let Some(officers) = officers.as_array() else {
            return Err(NormalizeError::Shape {
                pointer: OFFICERS_POINTER.to_string(),
                expected: "an array",
                found: describe(officers).to_string(),
            });
        };

        let mut facts = Vec::new();
        for entry in officers {
            let officer = entry.get("officer").unwrap_or(entry);
            let Some(name) = str_at(officer, "/name") else {
                continue;
            };
            let Some(company) = str_at(officer, "/company/name") else {
                continue;
            };
            let position = str_at(officer, "/position").unwrap_or("officer");
            facts.push(ParsedFact::new(
                "officer of",
                FactValue::Relation {
                    from: name.to_string(),
                    to: company.to_string(),
                    relation: position.to_string(),
                },
            ));
            if let Some(start) = str_at(officer, "/start_date") {
                facts.push(ParsedFact::new(
                    "appointment",
                    FactValue::Event {
                        date: start.to_string(),
                        description: format!("{name} appointed {position} of {company}"),
                    },
                ));
            }
        }
        Ok(facts)
    }
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
