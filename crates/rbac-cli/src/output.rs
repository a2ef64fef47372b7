//! Rendering of sync results

use std::fmt::Write as _;

use colored::Colorize;

use rbac_core::{Summary, SyncResult};

use crate::cli::OutputFormat;
use crate::error::Result;

/// Render `result` in the requested format.
pub fn render(result: &SyncResult, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Text => render_text(result),
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Yaml => serde_yaml::to_string(result)?,
    })
}

fn render_text(result: &SyncResult) -> String {
    let mut out = String::new();

    let status = if result.success {
        "SUCCESS".green().bold()
    } else {
        "FAILED".red().bold()
    };

    // Writing to a String cannot fail
    let _ = writeln!(out, "Synchronization Results");
    let _ = writeln!(out, "{}", "=".repeat(23));
    let _ = writeln!(out, "Status: {}", status);
    let _ = writeln!(out, "Duration: {:?}", result.duration);
    let _ = writeln!(out, "Dry Run: {}", result.dry_run);
    let _ = writeln!(out);

    let _ = writeln!(out, "Summary:");
    for line in summary_lines(&result.summary) {
        let _ = writeln!(out, "  {}", line);
    }

    if !result.errors.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", "Errors:".red().bold());
        for err in &result.errors {
            let _ = writeln!(out, "  - {}", err);
        }
    }

    if !result.operations.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Operations:");
        for op in &result.operations {
            let mark = if op.success {
                "✓".green()
            } else {
                "✗".red()
            };
            let _ = write!(
                out,
                "  {} {} {} {} - {}",
                mark, op.entity, op.action, op.resource, op.description
            );
            if let Some(err) = &op.error {
                let _ = write!(out, " ({})", err.red());
            }
            let _ = writeln!(out);
        }
    }

    out.trim_end().to_string()
}

fn summary_lines(s: &Summary) -> Vec<String> {
    let triple = |label: &str, created: usize, updated: usize, deleted: usize| {
        format!(
            "{}: {} created, {} updated, {} deleted",
            label, created, updated, deleted
        )
    };
    vec![
        triple(
            "Resources",
            s.resources_created,
            s.resources_updated,
            s.resources_deleted,
        ),
        triple("Roles", s.roles_created, s.roles_updated, s.roles_deleted),
        triple(
            "Permissions",
            s.permissions_created,
            s.permissions_updated,
            s.permissions_deleted,
        ),
        triple("Scopes", s.scopes_created, s.scopes_updated, s.scopes_deleted),
        triple(
            "Organization scopes",
            s.organization_scopes_created,
            s.organization_scopes_updated,
            s.organization_scopes_deleted,
        ),
        triple(
            "Applications",
            s.applications_created,
            s.applications_updated,
            s.applications_deleted,
        ),
        format!("Customizations: {} updated", s.customizations_updated),
        format!("Sign-in experience: {} updated", s.sign_in_experience_updated),
        format!("Connectors: {} synced", s.connectors_synced),
    ]
}
