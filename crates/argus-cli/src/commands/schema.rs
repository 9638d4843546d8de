use anyhow::bail;
use argus_core::{
    InvestigationReport, SourceDescriptor, SubjectInput, WorkflowDefinition, WorkflowExecution,
};
use schemars::schema_for;
use serde_json::Value;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::SchemaArgs;
use crate::output::output;

const SCHEMA_NAMES: &[&str] = &["execution", "report", "source", "subject", "workflow"];

fn schema_by_name(name: &str) -> anyhow::Result<Option<Value>> {
    let schema = match name {
        "execution" => schema_for!(WorkflowExecution),
        "report" => schema_for!(InvestigationReport),
        "source" => schema_for!(SourceDescriptor),
        "subject" => schema_for!(SubjectInput),
        "workflow" => schema_for!(WorkflowDefinition),
        _ => return Ok(None),
    };
    Ok(Some(serde_json::to_value(schema)?))
}

/// Handle `argus schema`.
pub fn handle(args: &SchemaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let name = args.type_name.trim().to_ascii_lowercase();
    if name == "list" {
        return output(&SCHEMA_NAMES, flags.format);
    }
    match schema_by_name(&name)? {
        Some(schema) => output(&schema, flags.format),
        None => bail!(
            "unknown schema '{}'; expected one of: {}",
            args.type_name,
            SCHEMA_NAMES.join(", ")
        ),
    }
}
