use argus_core::{InvestigationReport, RankingSource};
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::ui;

pub mod table;

/// Render a serializable response to a string in the requested format.
pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        OutputFormat::Table => render_value_table(&serde_json::to_value(value)?),
        OutputFormat::Raw => Ok(serde_json::to_string(value)?),
    }
}

/// Print a serializable response in the requested format.
pub fn output<T: Serialize>(value: &T, format: OutputFormat) -> anyhow::Result<()> {
    let rendered = render(value, format)?;
    println!("{rendered}");
    Ok(())
}

/// Print an investigation report. Tables show sections, facts and calls
/// instead of the generic key/value view.
pub fn output_report(report: &InvestigationReport, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Table {
        println!("{}", render_report_tables(report));
        return Ok(());
    }
    output(report, format)
}

fn options() -> table::TableOptions {
    let prefs = ui::prefs();
    table::TableOptions {
        max_width: prefs.term_width,
        color: prefs.table_color,
    }
}

fn render_report_tables(report: &InvestigationReport) -> String {
    let mut blocks = vec![format!(
        "{} | {} ok, {} failed, {} skipped | ranking: {}",
        report.id,
        report.succeeded_calls(),
        report.failed_calls(),
        report.skipped_calls(),
        ranking_label(&report.ranking),
    )];

    for section in &report.sections {
        let kind = section
            .visualization
            .as_ref()
            .map_or("-", |v| v.kind.as_str());
        let mut heading = format!("\n[{}] {} ({kind})", section.topic, section.title);
        if section.degraded {
            heading.push_str(" degraded");
        }
        blocks.push(heading);
        blocks.push(section.content.clone());
        if section.facts.is_empty() {
            continue;
        }
        let rows = section
            .facts
            .iter()
            .map(|merged| {
                vec![
                    merged.fact.label.clone(),
                    merged.fact.value.to_string(),
                    merged.corroboration.to_string(),
                    merged.sources.join(", "),
                ]
            })
            .collect::<Vec<_>>();
        blocks.push(table::render_table(
            &["fact", "value", "sources", "reported by"],
            &rows,
            options(),
        ));
    }

    if !report.outcomes.is_empty() {
        let rows = report
            .outcomes
            .iter()
            .map(|outcome| {
                vec![
                    outcome.source_id.clone(),
                    outcome.status.to_string(),
                    outcome.attempts.to_string(),
                    outcome.latency_ms.to_string(),
                    outcome
                        .http_status
                        .map_or_else(|| String::from("-"), |s| s.to_string()),
                ]
            })
            .collect::<Vec<_>>();
        blocks.push(String::from("\nCalls"));
        blocks.push(table::render_table(
            &["source", "status", "attempts", "ms", "http"],
            &rows,
            options(),
        ));
    }
    blocks.join("\n")
}

fn ranking_label(ranking: &RankingSource) -> String {
    match ranking {
        RankingSource::Deterministic => String::from("deterministic"),
        RankingSource::Oracle => String::from("oracle"),
        RankingSource::Fallback { reason } => format!("fallback ({reason})"),
    }
}

fn render_value_table(value: &Value) -> anyhow::Result<String> {
    match value {
        Value::Array(items) => Ok(render_array_table(items)),
        Value::Object(map) => {
            let mut rows = map
                .iter()
                .map(|(key, value)| vec![key.clone(), value_to_cell(value)])
                .collect::<Vec<_>>();
            rows.sort();
            Ok(table::render_table(&["key", "value"], &rows, options()))
        }
        scalar => Ok(table::render_table(
            &["value"],
            &[vec![value_to_cell(scalar)]],
            options(),
        )),
    }
}

fn render_array_table(items: &[Value]) -> String {
    if items.is_empty() {
        return String::from("(no rows)");
    }

    if !items.iter().all(Value::is_object) {
        let rows = items
            .iter()
            .map(|item| vec![value_to_cell(item)])
            .collect::<Vec<_>>();
        return table::render_table(&["value"], &rows, options());
    }

    // Columns in first-seen order so `id` and friends stay on the left.
    let mut headers = Vec::<String>::new();
    for map in items.iter().filter_map(Value::as_object) {
        for key in map.keys() {
            if !headers.contains(key) {
                headers.push(key.clone());
            }
        }
    }

    let header_refs = headers.iter().map(String::as_str).collect::<Vec<_>>();
    let rows = items
        .iter()
        .filter_map(Value::as_object)
        .map(|map| {
            headers
                .iter()
                .map(|header| map.get(header).map_or_else(|| String::from("-"), value_to_cell))
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    table::render_table(&header_refs, &rows, options())
}

fn value_to_cell(value: &Value) -> String {
    match value {
        Value::Null => String::from("-"),
        Value::Bool(v) => v.to_string(),
        Value::Number(v) => v.to_string(),
        Value::String(v) => v.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| String::from("<invalid-json>")),
    }
}

#[cfg(test)]
mod tests {
    use argus_core::ids::{PREFIX_INVESTIGATION, generate_id};
    use argus_core::{InvestigationReport, RankingSource, SignalSet};
    use serde::Serialize;

    use super::{render, render_report_tables};
    use crate::cli::OutputFormat;

    #[derive(Serialize)]
    struct Row {
        id: &'static str,
        priority: i32,
    }

    #[test]
    fn json_render_is_valid_json() {
        let value = Row {
            id: "emailrep",
            priority: 2,
        };
        let out = render(&value, OutputFormat::Json).expect("json render should work");
        let parsed: serde_json::Value = serde_json::from_str(&out).expect("json should parse");
        assert_eq!(parsed["id"], "emailrep");
        assert_eq!(parsed["priority"], 2);
    }

    #[test]
    fn raw_render_is_single_line_json() {
        let value = vec![Row { id: "a", priority: 0 }, Row { id: "b", priority: 1 }];
        let out = render(&value, OutputFormat::Raw).expect("raw render should work");
        assert!(!out.contains('\n'));
    }

    #[test]
    fn array_table_keeps_field_order() {
        let value = vec![Row {
            id: "emailrep",
            priority: 2,
        }];
        let out = render(&value, OutputFormat::Table).expect("table render should work");
        let header = out.lines().next().expect("header line");
        assert!(header.starts_with("id"));
        assert!(header.contains("priority"));
    }

    #[test]
    fn empty_report_table_has_summary_line() {
        let report = InvestigationReport {
            id: generate_id(PREFIX_INVESTIGATION).expect("id"),
            generated_at: chrono::Utc::now(),
            signals: SignalSet::default(),
            sections: Vec::new(),
            outcomes: Vec::new(),
            exclusions: Vec::new(),
            ranking: RankingSource::Deterministic,
            truncated: 0,
        };
        let out = render_report_tables(&report);
        assert!(out.contains("0 ok, 0 failed, 0 skipped"));
        assert!(out.contains("deterministic"));
    }
}
