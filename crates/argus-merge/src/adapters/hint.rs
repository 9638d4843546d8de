//! Generic adapter driven by a source's [`ResponseHint`].
//!
//! With field hints, each hint's JSON pointer (relative to the hint root)
//! is read and converted to the hinted [`FactKind`]. Missing or `null`
//! fields are skipped; arrays yield one fact per element. Without field
//! hints, every scalar leaf is flattened into a fact labelled by its path.

use argus_core::{FactKind, FactValue, FieldHint, ParsedFact, ResponseHint};
use serde_json::{Map, Value};

use super::Adapter;
use crate::error::NormalizeError;

/// Leaves taken from an unhinted response before the rest is dropped.
const MAX_FLATTENED_FACTS: usize = 100;

const DATE_KEYS: &[&str] = &["date", "breachdate", "timestamp", "created_at", "time"];
const DESCRIPTION_KEYS: &[&str] = &["title", "name", "description", "event"];
const LABEL_KEYS: &[&str] = &["name", "title", "value", "id"];

#[derive(Debug, Clone, Copy, Default)]
pub struct HintAdapter;

impl Adapter for HintAdapter {
    fn normalize(
        &self,
        raw: &Value,
        hint: &ResponseHint,
    ) -> Result<Vec<ParsedFact>, NormalizeError> {
        let root = match hint.root.as_deref() {
            Some(pointer) if !pointer.is_empty() => {
                raw.pointer(pointer).ok_or_else(|| NormalizeError::MissingRoot {
                    pointer: pointer.to_string(),
                })?
            }
            _ => raw,
        };

        if hint.fields.is_empty() {
            let mut facts = Vec::new();
            flatten(root, "", &mut facts);
            return Ok(facts);
        }

        let mut facts = Vec::new();
        for field in &hint.fields {
            let Some(value) = root.pointer(&field.pointer) else {
                continue;
            };
            match value {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items.iter().filter(|v| !v.is_null()) {
                        facts.push(convert(field, item)?);
                    }
                }
                other => facts.push(convert(field, other)?),
            }
        }
        Ok(facts)
    }
}

fn convert(field: &FieldHint, value: &Value) -> Result<ParsedFact, NormalizeError> {
    let pointer = field.pointer.as_str();
    let fact_value = match field.kind {
        FactKind::Text => FactValue::Text(text(pointer, value, "text")?),
        FactKind::Category => FactValue::Category(text(pointer, value, "a category")?),
        FactKind::Number => FactValue::Number(
            number(value).ok_or_else(|| NormalizeError::shape(pointer, "a number", value))?,
        ),
        FactKind::Flag => FactValue::Flag(
            flag(value).ok_or_else(|| NormalizeError::shape(pointer, "a flag", value))?,
        ),
        FactKind::Coordinates => coordinates(value)
            .ok_or_else(|| NormalizeError::shape(pointer, "coordinates", value))?,
        FactKind::Event => event(value, &field.label)
            .ok_or_else(|| NormalizeError::shape(pointer, "a dated event", value))?,
        FactKind::Relation => relation(value)
            .ok_or_else(|| NormalizeError::shape(pointer, "a relation", value))?,
    };
    let fact = ParsedFact::new(field.label.clone(), fact_value);
    Ok(match &field.unit {
        Some(unit) => fact.with_unit(unit.clone()),
        None => fact,
    })
}

fn text(pointer: &str, value: &Value, expected: &'static str) -> Result<String, NormalizeError> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Object(map) => find_str(map, LABEL_KEYS)
            .map(str::to_string)
            .ok_or_else(|| NormalizeError::shape(pointer, expected, value)),
        _ => Err(NormalizeError::shape(pointer, expected, value)),
    }
}

fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

fn flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn coordinates(value: &Value) -> Option<FactValue> {
    let map = value.as_object()?;
    let lat = ["lat", "latitude", "trilat"]
        .iter()
        .find_map(|k| get_ci(map, k).and_then(number))?;
    let lon = ["lon", "lng", "longitude", "trilong"]
        .iter()
        .find_map(|k| get_ci(map, k).and_then(number))?;
    let in_range = (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon);
    in_range.then_some(FactValue::Coordinates { lat, lon })
}

fn event(value: &Value, label: &str) -> Option<FactValue> {
    match value {
        Value::String(date) if !date.trim().is_empty() => Some(FactValue::Event {
            date: date.trim().to_string(),
            description: label.to_string(),
        }),
        Value::Object(map) => {
            let date = find_str(map, DATE_KEYS)?;
            let description = find_str(map, DESCRIPTION_KEYS).unwrap_or(label);
            Some(FactValue::Event {
                date: date.to_string(),
                description: description.to_string(),
            })
        }
        _ => None,
    }
}

fn relation(value: &Value) -> Option<FactValue> {
    let map = value.as_object()?;
    let from = find_str(map, &["from", "source"])?;
    let to = find_str(map, &["to", "target"])?;
    let relation = find_str(map, &["relation", "type", "role"]).unwrap_or("related to");
    Some(FactValue::Relation {
        from: from.to_string(),
        to: to.to_string(),
        relation: relation.to_string(),
    })
}

/// Case-insensitive key lookup.
fn get_ci<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// First non-empty string under any of `keys`, in key order.
fn find_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| get_ci(map, k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn flatten(value: &Value, path: &str, out: &mut Vec<ParsedFact>) {
    if out.len() >= MAX_FLATTENED_FACTS {
        return;
    }
    let label = if path.is_empty() { "value" } else { path };
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push(ParsedFact::new(label, FactValue::Flag(*b))),
        Value::Number(n) => {
            if let Some(n) = n.as_f64() {
                out.push(ParsedFact::new(label, FactValue::Number(n)));
            }
        }
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                out.push(ParsedFact::new(label, FactValue::Text(s.to_string())));
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten(item, &join(path, &i.to_string()), out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                flatten(item, &join(path, key), out);
            }
        }
    }
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}
