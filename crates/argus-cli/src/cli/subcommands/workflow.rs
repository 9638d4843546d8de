use std::path::PathBuf;

use argus_core::enums::WorkflowLevel;
use clap::{Args, Subcommand};

use crate::cli::root_commands::SubjectArgs;

/// Workflow commands.
#[derive(Clone, Debug, Subcommand)]
pub enum WorkflowCommands {
    /// List workflow definitions.
    List,
    /// Add or replace workflows from a TOML file of `[[workflow]]` tables.
    Add { file: PathBuf },
    /// Remove a workflow definition.
    Remove { id: String },
    /// Edit a stored workflow. Rejected while it is running.
    Edit(EditArgs),
    /// Run a workflow now. Subject flags override its stored subject.
    Run {
        id: String,
        #[command(flatten)]
        subject: SubjectArgs,
    },
    /// Fire a named event, starting every workflow bound to it.
    Event {
        /// Event name, e.g. `new_case`.
        event: String,
        #[command(flatten)]
        subject: SubjectArgs,
    },
    /// Start every scheduled workflow that is due.
    Tick,
    /// Keep running, starting due scheduled workflows until Ctrl-C.
    Serve {
        /// Seconds between schedule checks.
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        every: u64,
    },
    /// Past executions, oldest first.
    History {
        /// Only this workflow's executions.
        id: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Clone, Debug, Args)]
pub struct EditArgs {
    pub id: String,
    #[arg(long)]
    pub rename: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub level: Option<WorkflowLevel>,
    /// Step id to drop. Repeatable.
    #[arg(long = "remove-step")]
    pub remove_steps: Vec<String>,
}
