//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// rbac-sync - Reconcile an identity directory with a declarative RBAC file
#[derive(Parser, Debug)]
#[command(name = "rbac-sync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Desired-state file
    #[arg(
        short,
        long,
        global = true,
        env = "RBAC_CONFIG",
        default_value = "config.yml"
    )]
    pub config: PathBuf,

    /// Environment file to load before reading settings (default: ./.env if present)
    #[arg(long, global = true)]
    pub env_file: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Reconcile the directory with the desired-state file
    ///
    /// Examples:
    ///   rbac-sync sync                     # Create and update only
    ///   rbac-sync sync --dry-run           # Report what each phase would do
    ///   rbac-sync sync --cleanup           # Also delete undeclared entities
    ///   rbac-sync sync --output json       # Machine-readable result
    Sync(SyncArgs),

    /// Validate the desired-state file without contacting the directory
    Validate,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    /// Show what would be done without making changes
    #[arg(long)]
    pub dry_run: bool,

    /// Skip synchronizing resources
    #[arg(long)]
    pub skip_resources: bool,

    /// Skip synchronizing roles (and their permissions)
    #[arg(long)]
    pub skip_roles: bool,

    /// Skip synchronizing permissions
    #[arg(long)]
    pub skip_permissions: bool,

    /// Proceed even if permission or role references do not resolve
    #[arg(long)]
    pub force: bool,

    /// Delete resources, roles, and scopes not defined in the file (DANGEROUS)
    #[arg(long)]
    pub cleanup: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

/// Result rendering
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_sync_flags() {
        let cli = Cli::try_parse_from([
            "rbac-sync",
            "-c",
            "rbac.yml",
            "sync",
            "--dry-run",
            "--cleanup",
            "--skip-roles",
            "-o",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.config, PathBuf::from("rbac.yml"));
        let Commands::Sync(args) = cli.command else {
            panic!("expected sync command");
        };
        assert!(args.dry_run);
        assert!(args.cleanup);
        assert!(args.skip_roles);
        assert!(!args.skip_resources);
        assert_eq!(args.output, OutputFormat::Json);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["rbac-sync", "validate", "--verbose"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.command, Commands::Validate);
    }

    #[test]
    fn test_unknown_output_format_rejected() {
        assert!(Cli::try_parse_from(["rbac-sync", "sync", "--output", "xml"]).is_err());
    }
}
