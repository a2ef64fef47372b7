//! Desired-state schema
//!
//! Mirrors the YAML layout operators author:
//!
//! ```yaml
//! metadata: { name, version, description }
//! organization_roles: [ { id, name, type, priority, permissions: [{ id }] } ]
//! user_roles:         [ { id, name, type, priority, permissions: [{ id }] } ]
//! resources:          [ { name, actions: [string] } ]
//! third_party_apps:   [ { name, description, display_name, scopes, ... } ]
//! customizations:     { custom_jwt_claims: { enabled, script_path } }
//! sign_in_experience: { colors, branding, custom_css_path, language, sign_in, sign_up, social_sign_in }
//! connectors:         { smtp: { host, port, username, password, from_email, ... } }
//! ```
//!
//! Missing scalar fields deserialize to empty values so that validation,
//! not the parser, reports what is absent.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Consent scopes granted to a third-party application that declares none.
pub const DEFAULT_APPLICATION_SCOPES: &[&str] = &[
    "profile",
    "email",
    "roles",
    "urn:logto:scope:organizations",
    "urn:logto:scope:organization_roles",
];

/// The complete desired state of a directory tenant.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DesiredState {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub organization_roles: Vec<Role>,
    #[serde(default)]
    pub user_roles: Vec<Role>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub third_party_apps: Vec<Application>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customizations: Option<Customizations>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in_experience: Option<SignInExperience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connectors: Option<Connectors>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
}

/// Which half of the role hierarchy a role belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleType {
    /// Governs membership and capabilities inside a tenant organization.
    Organization,
    /// Governs an individual user's technical capabilities.
    User,
}

impl RoleType {
    /// Resolve a role's type tag, falling back to `default` for an empty tag.
    pub fn from_tag(tag: &str, default: RoleType) -> Result<RoleType, Error> {
        if tag.trim().is_empty() {
            Ok(default)
        } else {
            tag.parse()
        }
    }
}

impl FromStr for RoleType {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "organization" | "org" => Ok(RoleType::Organization),
            "user" => Ok(RoleType::User),
            _ => Err(Error::InvalidRoleType {
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for RoleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleType::Organization => write!(f, "organization"),
            RoleType::User => write!(f, "user"),
        }
    }
}

/// A role declaration.
///
/// `id` is the desired-state key used for cross references (application
/// access control). The directory never sees it: roles are matched
/// remotely by case-insensitive `name`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Role {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type")]
    pub role_type: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl Role {
    /// Iterate the scope names this role grants, in declaration order.
    pub fn permission_ids(&self) -> impl Iterator<Item = &str> {
        self.permissions.iter().map(|p| p.id.as_str())
    }

    fn resolves_to(&self, wanted: RoleType, default: RoleType) -> bool {
        RoleType::from_tag(&self.role_type, default).is_ok_and(|t| t == wanted)
    }
}

/// A permission reference; `id` is a scope name such as `read:systems`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// An API resource and the actions it exposes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resource {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl Resource {
    /// Scope name for one of this resource's actions.
    pub fn scope_name(&self, action: &str) -> String {
        format!("{}:{}", action, self.name)
    }

    /// All scope names implied by this resource, in action order.
    pub fn scope_names(&self) -> Vec<String> {
        self.actions.iter().map(|a| self.scope_name(a)).collect()
    }
}

/// A third-party OAuth client. `name` is the application's FQDN.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Application {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub redirect_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub post_logout_redirect_uris: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_control: Option<AccessControl>,
}

impl Application {
    /// Consent scopes to grant: the declared list, or the defaults when empty.
    pub fn effective_scopes(&self) -> Vec<String> {
        if self.scopes.is_empty() {
            DEFAULT_APPLICATION_SCOPES
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            self.scopes.clone()
        }
    }
}

/// Which desired-state role IDs may use a third-party application.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccessControl {
    #[serde(default)]
    pub organization_roles: Vec<String>,
    #[serde(default)]
    pub user_roles: Vec<String>,
}

/// Tenant-level customizations outside the role hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Customizations {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_jwt_claims: Option<CustomJwtClaims>,
}

/// Access-token claims script, stored next to the desired-state file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomJwtClaims {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub script_path: String,
}

/// Hosted sign-in page settings. Paths are relative to the desired-state file.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SignInExperience {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<SignInColors>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<SignInBranding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<SignInLanguage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_in: Option<SignInMethods>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sign_up: Option<SignUpSettings>,
    /// Passed to the directory as-is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_sign_in: Option<BTreeMap<String, serde_yaml::Value>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignInColors {
    #[serde(default)]
    pub primary_color: String,
    #[serde(default)]
    pub primary_color_dark: String,
    #[serde(default)]
    pub dark_mode_enabled: bool,
}

/// Image files uploaded inline as data URLs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignInBranding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_dark_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub favicon_dark_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignInLanguage {
    #[serde(default)]
    pub auto_detect: bool,
    #[serde(default)]
    pub fallback_language: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignInMethods {
    #[serde(default)]
    pub methods: Vec<SignInMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignInMethod {
    #[serde(default)]
    pub identifier: String,
    #[serde(default)]
    pub password: bool,
    #[serde(default)]
    pub verification_code: bool,
    #[serde(default)]
    pub is_password_primary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignUpSettings {
    #[serde(default)]
    pub identifiers: Vec<String>,
    #[serde(default)]
    pub password: bool,
    #[serde(default)]
    pub verify: bool,
    #[serde(default)]
    pub secondary_identifiers: Vec<String>,
}

/// Outbound connectors configured on the tenant.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Connectors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub smtp: Option<SmtpConnector>,
}

/// The tenant's SMTP mail connector.
#[derive(Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SmtpConnector {
    #[serde(default)]
    pub host: String,
    /// Defaults to [`SmtpConnector::DEFAULT_PORT`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    /// Implicit TLS on connect.
    #[serde(default)]
    pub secure: bool,
    /// Require STARTTLS.
    #[serde(default)]
    pub tls: bool,
    #[serde(default)]
    pub debug: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logger: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_file_access: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_url_access: Option<bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_headers: BTreeMap<String, String>,
    /// HTML body of the password-reset mail. Other mails use a plain-text
    /// verification-code body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forgot_password_template: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_settings: Option<TemplateSettings>,
}

impl fmt::Debug for SmtpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConnector")
            .field("host", &self.host)
            .field("port", &self.port())
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("from_email", &self.from_email)
            .finish_non_exhaustive()
    }
}

impl SmtpConnector {
    pub const DEFAULT_PORT: u16 = 587;

    pub fn port(&self) -> u16 {
        self.port.filter(|p| *p != 0).unwrap_or(Self::DEFAULT_PORT)
    }

    /// `Name <address>` when a sender name is set, else the bare address.
    pub fn formatted_sender(&self) -> String {
        match self.from_name.as_deref().filter(|n| !n.trim().is_empty()) {
            Some(name) => format!("{} <{}>", name, self.from_email),
            None => self.from_email.clone(),
        }
    }
}

/// Values substituted into mail templates.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

impl DesiredState {
    /// Organization roles tagged `organization` or `org`.
    ///
    /// Untagged entries pass validation but are not synced.
    pub fn organization_type_roles(&self) -> Vec<&Role> {
        self.organization_roles
            .iter()
            .filter(|r| r.resolves_to(RoleType::Organization, RoleType::User))
            .collect()
    }

    /// User roles whose type tag is `user` or empty.
    pub fn user_type_roles(&self) -> Vec<&Role> {
        self.user_roles
            .iter()
            .filter(|r| r.resolves_to(RoleType::User, RoleType::User))
            .collect()
    }

    /// Roles of one flavor, in declaration order.
    pub fn roles_of(&self, role_type: RoleType) -> Vec<&Role> {
        match role_type {
            RoleType::Organization => self.organization_type_roles(),
            RoleType::User => self.user_type_roles(),
        }
    }

    /// Permissions granted by any role, unique by ID, first-seen order.
    ///
    /// Organization roles come first, then user roles. These become the
    /// tenant's organization scopes.
    pub fn all_permissions(&self) -> Vec<&Permission> {
        let mut seen = HashSet::new();
        self.organization_type_roles()
            .into_iter()
            .chain(self.user_type_roles())
            .flat_map(|r| r.permissions.iter())
            .filter(|p| !p.id.is_empty() && seen.insert(p.id.as_str()))
            .collect()
    }

    /// Every `action:resource` scope name declared by the resources list.
    pub fn declared_scope_names(&self) -> HashSet<String> {
        self.resources.iter().flat_map(Resource::scope_names).collect()
    }

    /// The custom token-claims settings, when present and enabled.
    pub fn enabled_jwt_claims(&self) -> Option<&CustomJwtClaims> {
        self.customizations
            .as_ref()
            .and_then(|c| c.custom_jwt_claims.as_ref())
            .filter(|c| c.enabled)
    }

    /// The SMTP connector settings, when declared.
    pub fn smtp_connector(&self) -> Option<&SmtpConnector> {
        self.connectors.as_ref().and_then(|c| c.smtp.as_ref())
    }
}
