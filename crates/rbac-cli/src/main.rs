//! rbac-sync CLI
//!
//! Reconciles an identity directory tenant with a declarative YAML
//! description of its resources, roles, permissions, and applications.

mod cli;
mod commands;
mod error;
mod logging;
mod output;
mod settings;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    logging::init(cli.verbose);
    tracing::debug!("Verbose mode enabled");

    settings::load_env_file(cli.env_file.as_deref())?;

    match &cli.command {
        Commands::Sync(args) => commands::run_sync(&cli.config, args),
        Commands::Validate => commands::run_validate(&cli.config),
    }
}
