//! Validate command implementation

use std::path::Path;

use colored::Colorize;

use crate::error::Result;

/// Run the validate command
///
/// Applies every rule, with no `--force` escape hatch, and never contacts
/// the directory.
pub fn run_validate(config: &Path) -> Result<()> {
    println!(
        "{} Validating {}",
        "=>".blue().bold(),
        config.display().to_string().cyan()
    );

    let desired = super::load_desired_state(config, false)?;

    let scope_count: usize = desired.resources.iter().map(|r| r.actions.len()).sum();
    println!(
        "   {} {} v{}",
        "-".dimmed(),
        desired.metadata.name.bold(),
        desired.metadata.version
    );
    println!(
        "   {} {} resources ({} scopes)",
        "-".dimmed(),
        desired.resources.len(),
        scope_count
    );
    println!(
        "   {} {} organization roles, {} user roles",
        "-".dimmed(),
        desired.organization_type_roles().len(),
        desired.user_type_roles().len()
    );
    println!(
        "   {} {} third-party applications",
        "-".dimmed(),
        desired.third_party_apps.len()
    );
    if let Some(claims) = desired.enabled_jwt_claims() {
        println!(
            "   {} custom JWT claims from {}",
            "-".dimmed(),
            claims.script_path.cyan()
        );
    }

    if desired.sign_in_experience.is_some() {
        println!("   {} sign-in experience", "-".dimmed());
    }
    if let Some(smtp) = desired.smtp_connector() {
        println!(
            "   {} SMTP connector via {}:{}",
            "-".dimmed(),
            smtp.host.cyan(),
            smtp.port()
        );
    }

    println!("{} Configuration is valid.", "OK".green().bold());
    Ok(())
}
