//! Sample tenant scenarios
//!
//! Desired state is loaded from YAML on disk exactly as the CLI does, then
//! reconciled against the in-memory directory.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use rbac_core::{EntityKind, OperationAction, SyncEngine, SyncOptions};
use rbac_directory::{RemoteConnector, RoleKind};
use rbac_test_utils::{ConfigDir, InMemoryDirectory};

const API_BASE: &str = "https://api.example.com/api";

fn options_for(dir: &ConfigDir) -> SyncOptions {
    SyncOptions {
        api_base_url: API_BASE.to_string(),
        config_dir: dir.root().to_path_buf(),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_resource_single_role_example() {
    let dir = ConfigDir::new();
    let path = dir.write(
        "config.yml",
        r#"
metadata:
  name: example
  version: "1.0"
resources:
  - name: systems
    actions: [read, manage]
user_roles:
  - id: support
    name: support
    permissions:
      - id: read:systems
"#,
    );
    let desired = rbac_model::load_from_file(&path).unwrap();
    rbac_model::validate(&desired).unwrap();
    let directory = Arc::new(InMemoryDirectory::new());

    let result = SyncEngine::new(directory.clone(), options_for(&dir))
        .sync(&desired)
        .await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.summary.resources_created, 1);
    assert_eq!(result.summary.scopes_created, 2);
    assert_eq!(result.summary.roles_created, 1);
    assert_eq!(result.summary.permissions_created, 1);
    assert_eq!(result.summary.organization_scopes_created, 1);

    let assigns: Vec<&str> = result
        .operations_on(EntityKind::UserRolePermission)
        .filter(|op| op.action == OperationAction::Assign)
        .map(|op| op.resource.as_str())
        .collect();
    assert_eq!(assigns, vec!["support (1 permissions)"]);
    assert_eq!(
        directory.bound_scope_names(RoleKind::User, "support"),
        vec!["read:systems"]
    );
}

#[tokio::test]
async fn test_sample_config_with_claims_script() {
    let dir = ConfigDir::new();
    let config = format!(
        "{}\ncustomizations:\n  custom_jwt_claims:\n    enabled: true\n    script_path: scripts/claims.js\n",
        rbac_test_utils::SAMPLE_CONFIG
    );
    let path = dir.write("config.yml", &config);
    dir.write(
        "scripts/claims.js",
        "const getCustomJwtClaims = async () => {\r\n  return { tier: 'gold' };\r\n};\r\n",
    );
    let desired = rbac_model::load_from_file(&path).unwrap();
    rbac_model::validate(&desired).unwrap();

    let directory = Arc::new(InMemoryDirectory::new());
    directory.seed_management_resource();
    directory.seed_role(RoleKind::Organization, "Member", "Organization role: Member");
    let engine = SyncEngine::new(
        directory.clone(),
        SyncOptions {
            cleanup: true,
            ..options_for(&dir)
        },
    );

    let result = engine.sync(&desired).await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(
        directory.resource_names(),
        vec!["Logto Management API", "systems", "backups"]
    );
    assert_eq!(
        directory.role_names(RoleKind::Organization),
        vec!["Member", "Owner"]
    );
    assert_eq!(
        directory.bound_scope_names(RoleKind::Organization, "Owner"),
        vec!["manage:systems", "read:systems"]
    );
    assert_eq!(
        directory.bound_scope_names(RoleKind::User, "Support"),
        vec!["read:backups", "read:systems"]
    );
    assert_eq!(directory.display_name("portal.example.com").as_deref(), Some("Portal"));
    assert!(
        directory
            .claims_script()
            .unwrap()
            .contains("tier: 'gold'")
    );
    assert_eq!(result.summary.customizations_updated, 1);

    // Line-ending differences alone do not trigger another upload
    directory.clear_writes();
    let again = engine.sync(&desired).await;
    assert!(again.success, "{:?}", again.errors);
    assert!(again.operations.is_empty());
    assert!(directory.writes().is_empty());
}

#[tokio::test]
async fn test_tenant_settings_from_yaml_converge() {
    let dir = ConfigDir::new();
    let config = format!(
        r##"{}
sign_in_experience:
  colors:
    primary_color: "#0069A8"
    dark_mode_enabled: false
  branding:
    logo_path: branding/logo.svg
  language:
    auto_detect: true
    fallback_language: en
  sign_up:
    identifiers: [email]
    password: true
    verify: true

connectors:
  smtp:
    host: smtp.example.com
    port: 465
    username: mailer
    password: mailer-secret
    from_email: noreply@example.com
    from_name: Sample
    secure: true
"##,
        rbac_test_utils::SAMPLE_CONFIG
    );
    let path = dir.write("config.yml", &config);
    dir.write("branding/logo.svg", "<svg/>");
    let desired = rbac_model::load_from_file(&path).unwrap();
    rbac_model::validate(&desired).unwrap();

    let directory = Arc::new(InMemoryDirectory::new());
    let engine = SyncEngine::new(directory.clone(), options_for(&dir));

    let result = engine.sync(&desired).await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(result.summary.sign_in_experience_updated, 1);
    assert_eq!(result.summary.connectors_synced, 1);
    let settings = directory.sign_in_experience();
    assert_eq!(settings["languageInfo"]["fallbackLanguage"], "en");
    assert!(
        settings["branding"]["logoUrl"]
            .as_str()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,")
    );
    let smtp = directory.connectors(RemoteConnector::SMTP);
    assert_eq!(smtp[0].config["fromEmail"], "Sample <noreply@example.com>");
    assert_eq!(smtp[0].config["secure"], true);

    directory.clear_writes();
    let again = engine.sync(&desired).await;
    assert!(again.success, "{:?}", again.errors);
    assert!(again.operations.is_empty());
    assert!(directory.writes().is_empty());
}
