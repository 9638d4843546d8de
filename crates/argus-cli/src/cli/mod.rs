use clap::Parser;

pub mod global;
pub mod root_commands;
pub mod subcommands;

pub use global::{GlobalFlags, OutputFormat};
pub use root_commands::Commands;

/// Top-level CLI parser for the `argus` binary.
#[derive(Debug, Parser)]
#[command(name = "argus", version, about = "Argus - OSINT intelligence orchestration")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format: json, table, raw
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory holding `.argus/` (defaults to the current directory)
    #[arg(short, long, global = true)]
    pub root: Option<String>,
}

impl Cli {
    #[must_use]
    pub fn global_flags(&self) -> GlobalFlags {
        GlobalFlags {
            format: self.format,
            quiet: self.quiet,
            verbose: self.verbose,
            root: self.root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};
    use pretty_assertions::assert_eq;

    use super::{Cli, Commands, OutputFormat};
    use crate::cli::subcommands::{SourceCommands, WorkflowCommands};

    #[test]
    fn clap_command_tree_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_parse_before_subcommand() {
        let cli = Cli::try_parse_from([
            "argus",
            "--format",
            "table",
            "--verbose",
            "sources",
            "list",
        ])
        .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Table);
        assert!(cli.verbose);
        assert!(matches!(
            cli.command,
            Commands::Sources {
                action: SourceCommands::List
            }
        ));
    }

    #[test]
    fn global_flags_parse_after_subcommand() {
        let cli = Cli::try_parse_from(["argus", "workflow", "tick", "--format", "raw", "--quiet"])
            .expect("cli should parse");

        assert_eq!(cli.format, OutputFormat::Raw);
        assert!(cli.quiet);
        assert!(matches!(
            cli.command,
            Commands::Workflow {
                action: WorkflowCommands::Tick
            }
        ));
    }

    #[test]
    fn output_format_rejects_invalid_value() {
        let parsed = Cli::try_parse_from(["argus", "--format", "xml", "sources", "list"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn investigate_collects_subject_and_sources() {
        let cli = Cli::try_parse_from([
            "argus",
            "investigate",
            "--email",
            "jane@example.com",
            "--handles",
            "janedoe, jd",
            "--sources",
            "emailrep,github-user",
            "--limit",
            "3",
            "--dry-run",
        ])
        .expect("cli should parse");

        let Commands::Investigate(args) = cli.command else {
            panic!("expected investigate");
        };
        assert_eq!(args.subject.email.as_deref(), Some("jane@example.com"));
        assert_eq!(args.subject.handles.as_deref(), Some("janedoe, jd"));
        assert_eq!(
            args.sources,
            Some(vec!["emailrep".to_string(), "github-user".to_string()])
        );
        assert_eq!(args.limit, Some(3));
        assert!(args.dry_run);
    }

    #[test]
    fn event_name_and_subject_name_do_not_clash() {
        let cli = Cli::try_parse_from(["argus", "workflow", "event", "new_case", "--name", "Jane Doe"])
            .expect("cli should parse");

        let Commands::Workflow {
            action: WorkflowCommands::Event { event, subject },
        } = cli.command
        else {
            panic!("expected workflow event");
        };
        assert_eq!(event, "new_case");
        assert_eq!(subject.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn serve_and_edit_parse() {
        let cli = Cli::try_parse_from(["argus", "workflow", "serve", "--every", "30"])
            .expect("cli should parse");
        assert!(matches!(
            cli.command,
            Commands::Workflow {
                action: WorkflowCommands::Serve { every: 30 }
            }
        ));
        assert!(Cli::try_parse_from(["argus", "workflow", "serve", "--every", "0"]).is_err());

        let cli = Cli::try_parse_from([
            "argus",
            "workflow",
            "edit",
            "daily-check",
            "--level",
            "expert",
            "--remove-step",
            "summary",
            "--remove-step",
            "report",
        ])
        .expect("cli should parse");
        let Commands::Workflow {
            action: WorkflowCommands::Edit(args),
        } = cli.command
        else {
            panic!("expected workflow edit");
        };
        assert_eq!(args.id, "daily-check");
        assert_eq!(args.remove_steps, vec!["summary", "report"]);
        assert!(args.level.is_some());
    }

    #[test]
    fn root_flag_is_copied_into_global_flags() {
        let cli = Cli::try_parse_from(["argus", "--root", "/tmp/case", "schema", "report"])
            .expect("cli should parse");
        assert_eq!(cli.global_flags().root.as_deref(), Some("/tmp/case"));
    }
}
