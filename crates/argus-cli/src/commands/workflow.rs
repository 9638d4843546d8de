use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use argus_core::{SubjectInput, TriggerContext, WorkflowDefinition, WorkflowExecution};
use argus_workflow::WorkflowEdit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::root_commands::SubjectArgs;
use crate::cli::subcommands::{EditArgs, WorkflowCommands};
use crate::cli::{GlobalFlags, OutputFormat};
use crate::context::AppContext;
use crate::output::output;

#[derive(Deserialize)]
struct WorkflowFile {
    #[serde(default, rename = "workflow")]
    workflows: Vec<WorkflowDefinition>,
}

#[derive(Debug, Serialize)]
struct WorkflowRow<'a> {
    id: &'a str,
    name: &'a str,
    trigger: &'static str,
    level: &'static str,
    steps: usize,
}

impl<'a> From<&'a WorkflowDefinition> for WorkflowRow<'a> {
    fn from(workflow: &'a WorkflowDefinition) -> Self {
        Self {
            id: &workflow.id,
            name: &workflow.name,
            trigger: workflow.trigger.as_str(),
            level: workflow.level.as_str(),
            steps: workflow.steps.len(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ExecutionRow<'a> {
    id: &'a str,
    workflow_id: &'a str,
    status: &'static str,
    trigger: &'static str,
    steps: String,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl<'a> From<&'a WorkflowExecution> for ExecutionRow<'a> {
    fn from(execution: &'a WorkflowExecution) -> Self {
        let steps = execution
            .step_logs
            .iter()
            .map(|log| format!("{}:{}", log.step_id, log.status))
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            id: &execution.id,
            workflow_id: &execution.workflow_id,
            status: execution.status.as_str(),
            trigger: execution.trigger.as_str(),
            steps,
            started_at: execution.started_at,
            finished_at: execution.finished_at,
        }
    }
}

fn read_workflow_file(path: &Path) -> anyhow::Result<Vec<WorkflowDefinition>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file: WorkflowFile = toml::from_str(&text)
        .with_context(|| format!("invalid workflow file {}", path.display()))?;
    Ok(file.workflows)
}

/// Edits requested by `argus workflow edit`, in the order they apply.
fn edits(args: &EditArgs) -> Vec<WorkflowEdit> {
    let mut edits = Vec::new();
    if let Some(name) = &args.rename {
        edits.push(WorkflowEdit::Rename(name.clone()));
    }
    if let Some(description) = &args.description {
        edits.push(WorkflowEdit::SetDescription(description.clone()));
    }
    if let Some(level) = args.level {
        edits.push(WorkflowEdit::SetLevel(level));
    }
    edits.extend(args.remove_steps.iter().cloned().map(WorkflowEdit::RemoveStep));
    edits
}

fn subject_override(subject: &SubjectArgs) -> Option<SubjectInput> {
    (!subject.is_empty()).then(|| subject.to_subject())
}

/// Executions as compact rows for tables, in full otherwise.
fn output_executions(executions: &[WorkflowExecution], format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Table {
        let rows: Vec<ExecutionRow<'_>> = executions.iter().map(ExecutionRow::from).collect();
        output(&rows, format)
    } else {
        output(&executions, format)
    }
}

/// Handle `argus workflow`.
pub async fn handle(
    action: &WorkflowCommands,
    ctx: &AppContext,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        WorkflowCommands::List => {
            let workflows = ctx.store.list_workflows()?;
            if flags.format == OutputFormat::Table {
                let rows: Vec<WorkflowRow<'_>> = workflows.iter().map(WorkflowRow::from).collect();
                output(&rows, flags.format)
            } else {
                output(&workflows, flags.format)
            }
        }
        WorkflowCommands::Add { file } => {
            let workflows = read_workflow_file(file)?;
            if workflows.is_empty() {
                anyhow::bail!("{} contains no [[workflow]] tables", file.display());
            }
            let sequencer = ctx.sequencer()?;
            let mut ids = Vec::with_capacity(workflows.len());
            for workflow in workflows {
                let id = workflow.id.clone();
                sequencer
                    .save(workflow)
                    .with_context(|| format!("failed to save workflow '{id}'"))?;
                ids.push(id);
            }
            output(&serde_json::json!({ "action": "upserted", "ids": ids }), flags.format)
        }
        WorkflowCommands::Remove { id } => {
            let removed = ctx.sequencer()?.remove(id)?;
            output(
                &serde_json::json!({ "action": "removed", "ids": [removed.id] }),
                flags.format,
            )
        }
        WorkflowCommands::Edit(args) => {
            let edits = edits(args);
            if edits.is_empty() {
                anyhow::bail!("nothing to edit; pass --rename, --description, --level or --remove-step");
            }
            let workflow = ctx.sequencer()?.edit_all(&args.id, &edits)?;
            if flags.format == OutputFormat::Table {
                output(&WorkflowRow::from(&workflow), flags.format)
            } else {
                output(&workflow, flags.format)
            }
        }
        WorkflowCommands::Run { id, subject } => {
            let execution = ctx
                .sequencer()?
                .start(id, TriggerContext::manual(subject_override(subject)))
                .await?;
            if flags.format == OutputFormat::Table {
                output(&ExecutionRow::from(&execution), flags.format)
            } else {
                output(&execution, flags.format)
            }
        }
        WorkflowCommands::Event { event, subject } => {
            let executions = ctx
                .sequencer()?
                .fire_event(event, subject_override(subject))
                .await?;
            if executions.is_empty() {
                tracing::info!(%event, "no workflow is bound to this event");
            }
            output_executions(&executions, flags.format)
        }
        WorkflowCommands::Tick => {
            let executions = ctx.sequencer()?.tick(Utc::now()).await?;
            output_executions(&executions, flags.format)
        }
        WorkflowCommands::Serve { every } => {
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %e, "cannot listen for Ctrl-C; stopping scheduler");
                }
            };
            let started = ctx
                .sequencer()?
                .run_scheduler(Duration::from_secs(*every), shutdown)
                .await;
            output(&serde_json::json!({ "action": "served", "started": started }), flags.format)
        }
        WorkflowCommands::History { id, limit } => {
            let mut executions = ctx.store.list_executions(id.as_deref())?;
            if let Some(limit) = *limit {
                let skip = executions.len().saturating_sub(limit);
                executions.drain(..skip);
            }
            output_executions(&executions, flags.format)
        }
    }
}
