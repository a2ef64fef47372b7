//! Desired-state fixtures.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use rbac_model::{
    AccessControl, Application, Connectors, CustomJwtClaims, Customizations, DesiredState,
    Metadata, Permission, Resource, Role, SignInExperience, SmtpConnector,
};

/// A small but complete desired-state file exercising every section.
pub const SAMPLE_CONFIG: &str = r#"metadata:
  name: sample-tenant
  version: "1.0"
  description: Sample hierarchy

resources:
  - name: systems
    actions: [read, manage]
  - name: backups
    actions: [read]

organization_roles:
  - id: owner
    name: Owner
    type: org
    priority: 0
    permissions:
      - id: read:systems
      - id: manage:systems

user_roles:
  - id: support
    name: Support
    type: user
    priority: 1
    permissions:
      - id: read:systems
      - id: read:backups

third_party_apps:
  - name: portal.example.com
    description: Customer portal
    display_name: Portal
    redirect_uris: [https://portal.example.com/callback]
    access_control:
      organization_roles: [owner]
      user_roles: [support]
"#;

/// Fluent builder for [`DesiredState`] values.
///
/// ```rust,no_run
/// use rbac_test_utils::DesiredStateBuilder;
///
/// let desired = DesiredStateBuilder::new()
///     .resource("systems", &["read", "manage"])
///     .user_role("support", 1, &["read:systems"])
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct DesiredStateBuilder {
    state: DesiredState,
}

impl Default for DesiredStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DesiredStateBuilder {
    pub fn new() -> Self {
        Self {
            state: DesiredState {
                metadata: Metadata {
                    name: "test-tenant".to_string(),
                    version: "1.0".to_string(),
                    description: String::new(),
                },
                ..Default::default()
            },
        }
    }

    pub fn resource(mut self, name: &str, actions: &[&str]) -> Self {
        self.state.resources.push(Resource {
            name: name.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        });
        self
    }

    /// Add an organization role; its id is the lowercased name.
    pub fn organization_role(mut self, name: &str, priority: i64, permissions: &[&str]) -> Self {
        self.state
            .organization_roles
            .push(role(name, "org", priority, permissions));
        self
    }

    /// Add a user role; its id is the lowercased name.
    pub fn user_role(mut self, name: &str, priority: i64, permissions: &[&str]) -> Self {
        self.state
            .user_roles
            .push(role(name, "user", priority, permissions));
        self
    }

    pub fn application(mut self, name: &str, display_name: &str, scopes: &[&str]) -> Self {
        self.state.third_party_apps.push(Application {
            name: name.to_string(),
            description: format!("{} application", display_name),
            display_name: display_name.to_string(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            redirect_uris: vec![format!("https://{}/callback", name)],
            access_control: Some(AccessControl::default()),
            ..Default::default()
        });
        self
    }

    pub fn claims_script(mut self, script_path: &str) -> Self {
        self.state.customizations = Some(Customizations {
            custom_jwt_claims: Some(CustomJwtClaims {
                enabled: true,
                script_path: script_path.to_string(),
            }),
        });
        self
    }

    pub fn sign_in_experience(mut self, settings: SignInExperience) -> Self {
        self.state.sign_in_experience = Some(settings);
        self
    }

    /// Declare an SMTP connector for `host` sending as `noreply@<host>`.
    pub fn smtp(mut self, host: &str) -> Self {
        self.state.connectors = Some(Connectors {
            smtp: Some(SmtpConnector {
                host: host.to_string(),
                username: "mailer".to_string(),
                password: "mailer-secret".to_string(),
                from_email: format!("noreply@{}", host),
                ..Default::default()
            }),
        });
        self
    }

    pub fn build(self) -> DesiredState {
        self.state
    }
}

fn role(name: &str, role_type: &str, priority: i64, permissions: &[&str]) -> Role {
    Role {
        id: name.to_lowercase(),
        name: name.to_string(),
        role_type: role_type.to_string(),
        priority,
        permissions: permissions
            .iter()
            .map(|p| Permission {
                id: p.to_string(),
                name: None,
            })
            .collect(),
    }
}

/// A temporary directory holding a desired-state file and its companions.
pub struct ConfigDir {
    temp_dir: TempDir,
}

impl Default for ConfigDir {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigDir {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write `content` to `name` below the root; returns the full path.
    pub fn write(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    /// Write [`SAMPLE_CONFIG`] as `config.yml`.
    pub fn with_sample_config(self) -> Self {
        self.write("config.yml", SAMPLE_CONFIG);
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("config.yml")
    }
}
