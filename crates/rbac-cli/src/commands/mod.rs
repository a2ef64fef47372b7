//! Command implementations for rbac-cli

pub mod sync;
pub mod validate;

pub use sync::run_sync;
pub use validate::run_validate;

use std::path::Path;

use colored::Colorize;

use rbac_model::DesiredState;

use crate::error::Result;

/// Load and validate the desired-state file at `path`.
///
/// Structural failures always abort. Unresolved references abort too,
/// unless `force` is set, in which case each one is printed as a warning.
pub fn load_desired_state(path: &Path, force: bool) -> Result<DesiredState> {
    let desired = rbac_model::load_from_file(path)?;
    rbac_model::validate_structure(&desired)?;

    let mut references = rbac_model::reference_errors(&desired).into_iter();
    if !force && let Some(err) = references.next() {
        return Err(err.into());
    }
    for err in references {
        eprintln!("{} {}", "warning:".yellow().bold(), err);
        tracing::warn!(error = %err, "Ignoring unresolved reference (--force)");
    }

    Ok(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use rbac_test_utils::ConfigDir;

    const UNRESOLVED: &str = r#"
metadata:
  name: test
  version: "1.0"
organization_roles:
  - id: owner
    name: Owner
    permissions:
      - id: "frobnicate:widgets"
resources:
  - name: systems
    actions: [read]
"#;

    #[test]
    fn test_load_sample_config() {
        let dir = ConfigDir::new().with_sample_config();
        let desired = load_desired_state(&dir.config_path(), false).unwrap();
        assert_eq!(desired.resources.len(), 2);
    }

    #[test]
    fn test_unresolved_reference_is_fatal_without_force() {
        let dir = ConfigDir::new();
        let path = dir.write("config.yml", UNRESOLVED);
        let err = load_desired_state(&path, false).unwrap_err();
        assert!(matches!(err, CliError::Validation(_)));
        assert!(err.to_string().contains("frobnicate:widgets"));
    }

    #[test]
    fn test_force_downgrades_references() {
        let dir = ConfigDir::new();
        let path = dir.write("config.yml", UNRESOLVED);
        let desired = load_desired_state(&path, true).unwrap();
        assert_eq!(desired.organization_roles.len(), 1);
    }

    #[test]
    fn test_force_does_not_bypass_structure() {
        let dir = ConfigDir::new();
        let path = dir.write(
            "config.yml",
            "metadata:\n  name: test\n  version: \"1.0\"\nresources:\n  - name: systems\n    actions: []\n",
        );
        let err = load_desired_state(&path, true).unwrap_err();
        assert!(err.to_string().contains("at least one action"));
    }

    #[test]
    fn test_missing_file() {
        let dir = ConfigDir::new();
        let err = load_desired_state(&dir.root().join("absent.yml"), false).unwrap_err();
        assert!(matches!(err, CliError::Model(_)));
    }
}
