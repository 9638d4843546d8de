use std::path::PathBuf;

use clap::Subcommand;

/// Source catalog commands.
#[derive(Clone, Debug, Subcommand)]
pub enum SourceCommands {
    /// List every source in catalog order.
    List,
    /// Get a source by id.
    Get { id: String },
    /// Add or replace sources from a TOML file of `[[source]]` tables.
    Add { file: PathBuf },
    /// Remove a source.
    Remove { id: String },
    /// Install the built-in sources that are not already present.
    Seed,
}
