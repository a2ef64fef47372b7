//! Sync command implementation
//!
//! Loads the desired state, checks the directory is reachable, and runs
//! the reconciliation engine. Progress goes to stderr; the rendered result
//! goes to stdout so `--output json` can be piped.

use std::path::Path;
use std::sync::Arc;

use colored::Colorize;

use rbac_core::{SyncEngine, SyncOptions, SyncResult};
use rbac_directory::{DirectoryClient, DirectoryConfig, HttpDirectoryClient};
use rbac_model::DesiredState;

use crate::cli::SyncArgs;
use crate::error::{CliError, Result};
use crate::output;
use crate::settings::Settings;

/// Run the sync command
pub fn run_sync(config: &Path, args: &SyncArgs) -> Result<()> {
    eprintln!(
        "{} Loading desired state from {}",
        "=>".blue().bold(),
        config.display().to_string().cyan()
    );
    let desired = super::load_desired_state(config, args.force)?;
    let settings = Settings::from_env()?;
    let options = sync_options(config, args, &settings);

    if args.dry_run {
        eprintln!(
            "{} Dry run: no changes will be written",
            "=>".blue().bold()
        );
    }
    if args.cleanup {
        eprintln!(
            "{} Cleanup enabled: entities absent from {} will be deleted",
            "!".yellow().bold(),
            config.display()
        );
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(execute(&desired, &settings, options))?;

    println!("{}", output::render(&result, args.output)?);

    if result.success {
        Ok(())
    } else {
        Err(CliError::SyncFailed {
            errors: result.errors.len(),
        })
    }
}

fn sync_options(config: &Path, args: &SyncArgs, settings: &Settings) -> SyncOptions {
    let config_dir = config
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    SyncOptions {
        dry_run: args.dry_run,
        skip_resources: args.skip_resources,
        skip_roles: args.skip_roles,
        skip_permissions: args.skip_permissions,
        cleanup: args.cleanup,
        api_base_url: settings.api_base_url.clone(),
        config_dir,
    }
}

async fn execute(
    desired: &DesiredState,
    settings: &Settings,
    options: SyncOptions,
) -> Result<SyncResult> {
    let config = DirectoryConfig::new(
        &settings.directory_url,
        &settings.client_id,
        &settings.client_secret,
    );
    let client = HttpDirectoryClient::new(config)?;

    eprintln!(
        "{} Connecting to {}",
        "=>".blue().bold(),
        settings.directory_url.cyan()
    );
    client.ping().await.map_err(CliError::Connection)?;
    tracing::info!(tenant = %settings.tenant_id, "Directory connection OK");

    let engine = SyncEngine::new(Arc::new(client), options);
    Ok(engine.sync(desired).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;

    fn args() -> SyncArgs {
        SyncArgs {
            dry_run: true,
            skip_resources: false,
            skip_roles: true,
            skip_permissions: false,
            force: false,
            cleanup: false,
            output: OutputFormat::Text,
        }
    }

    fn settings() -> Settings {
        Settings {
            tenant_id: "acme".to_string(),
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            directory_url: "https://acme.logto.app".to_string(),
            api_base_url: "https://api.example.com".to_string(),
        }
    }

    #[test]
    fn test_options_follow_flags() {
        let options = sync_options(Path::new("conf/rbac.yml"), &args(), &settings());
        assert!(options.dry_run);
        assert!(options.skip_roles);
        assert!(!options.cleanup);
        assert_eq!(options.api_base_url, "https://api.example.com");
        assert_eq!(options.config_dir, Path::new("conf"));
    }

    #[test]
    fn test_bare_file_name_resolves_against_cwd() {
        let options = sync_options(Path::new("config.yml"), &args(), &settings());
        assert_eq!(options.config_dir, Path::new("."));
    }
}
