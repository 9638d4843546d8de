use argus_core::SubjectInput;
use clap::{Args, Subcommand};

use crate::cli::subcommands::{SourceCommands, WorkflowCommands};

/// Top-level command tree.
#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    /// Run one orchestration pass for a subject and print the report.
    Investigate(InvestigateArgs),
    /// Source catalog management.
    Sources {
        #[command(subcommand)]
        action: SourceCommands,
    },
    /// Workflow definitions, runs and history.
    Workflow {
        #[command(subcommand)]
        action: WorkflowCommands,
    },
    /// Print the JSON Schema of a record type.
    Schema(SchemaArgs),
}

/// Partial subject data. Every field is optional.
#[derive(Clone, Debug, Default, Args)]
pub struct SubjectArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    /// Comma or whitespace separated usernames.
    #[arg(long)]
    pub handles: Option<String>,
    #[arg(long)]
    pub location: Option<String>,
    /// License plate or VIN.
    #[arg(long)]
    pub vehicle: Option<String>,
    /// Free-text notes; emails, phones and @handles inside are mined.
    #[arg(long)]
    pub notes: Option<String>,
    /// Image URL or path.
    #[arg(long)]
    pub image: Option<String>,
}

impl SubjectArgs {
    pub fn is_empty(&self) -> bool {
        self.to_subject() == SubjectInput::default()
    }

    pub fn to_subject(&self) -> SubjectInput {
        SubjectInput {
            name: self.name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            handles: self.handles.clone(),
            location: self.location.clone(),
            vehicle: self.vehicle.clone(),
            notes: self.notes.clone(),
            image: self.image.clone(),
        }
    }
}

#[derive(Clone, Debug, Args)]
pub struct InvestigateArgs {
    #[command(flatten)]
    pub subject: SubjectArgs,
    /// Maximum number of sources to query.
    #[arg(long)]
    pub limit: Option<usize>,
    /// Only consider these source ids.
    #[arg(long, value_delimiter = ',')]
    pub sources: Option<Vec<String>>,
    /// Show signals and selected candidates without querying anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Clone, Debug, Args)]
pub struct SchemaArgs {
    /// Record type, e.g. `report`, `source`, `workflow`. Use `list` to see all.
    pub type_name: String,
}
