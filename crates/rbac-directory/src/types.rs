//! Entities as the directory's management API represents them
//!
//! Remote identifiers are opaque strings assigned by the directory. Field
//! names follow the API's camelCase wire format.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which role collection an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleKind {
    /// Tenant-hierarchy roles, bound to organization scopes.
    Organization,
    /// Global user roles, bound to resource scopes.
    User,
}

impl RoleKind {
    /// Collection path below `/api`.
    pub fn collection(&self) -> &'static str {
        match self {
            RoleKind::Organization => "organization-roles",
            RoleKind::User => "roles",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoleKind::Organization => write!(f, "organization"),
            RoleKind::User => write!(f, "user"),
        }
    }
}

/// An API resource registered in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteResource {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub indicator: String,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_ttl: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDraft {
    pub name: String,
    pub indicator: String,
    pub access_token_ttl: u64,
}

impl ResourceDraft {
    /// Access-token lifetime given to resources the engine creates, in seconds.
    pub const DEFAULT_TOKEN_TTL: u64 = 3600;

    pub fn new(name: impl Into<String>, indicator: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            indicator: indicator.into(),
            access_token_ttl: Self::DEFAULT_TOKEN_TTL,
        }
    }
}

/// A grantable scope: either a resource scope or an organization scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteScope {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RemoteScope {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeDraft {
    pub name: String,
    pub description: String,
}

/// A role of either kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRole {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl RemoteRole {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleDraft {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcClientMetadata {
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub post_logout_redirect_uris: Vec<String>,
}

/// A registered OAuth application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteApplication {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "type")]
    pub app_type: Option<String>,
    #[serde(default)]
    pub is_third_party: bool,
    #[serde(default)]
    pub oidc_client_metadata: Option<OidcClientMetadata>,
    #[serde(default)]
    pub custom_data: Value,
}

impl RemoteApplication {
    pub fn description(&self) -> &str {
        self.description.as_deref().unwrap_or_default()
    }
}

/// Body for creating or patching a third-party application.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    pub name: String,
    pub description: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub app_type: Option<String>,
    pub is_third_party: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oidc_client_metadata: Option<OidcClientMetadata>,
    pub custom_data: Value,
}

impl ApplicationDraft {
    /// Application type the directory assigns to web-based OAuth clients.
    pub const TRADITIONAL: &'static str = "Traditional";
}

/// A configured connector instance. `connector_id` names the connector
/// factory, e.g. [`RemoteConnector::SMTP`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConnector {
    pub id: String,
    pub connector_id: String,
    #[serde(default)]
    pub config: Value,
}

impl RemoteConnector {
    pub const SMTP: &'static str = "simple-mail-transfer-protocol";
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_resource_deserializes_camel_case() {
        let resource: RemoteResource = serde_json::from_value(json!({
            "id": "r1",
            "name": "Logto Management API",
            "indicator": "https://default.logto.app/api",
            "isDefault": true,
            "accessTokenTtl": 3600,
            "tenantId": "ignored"
        }))
        .unwrap();

        assert!(resource.is_default);
        assert_eq!(resource.access_token_ttl, Some(3600));
    }

    #[test]
    fn test_application_draft_serializes_camel_case() {
        let draft = ApplicationDraft {
            name: "portal.example".to_string(),
            description: "Portal".to_string(),
            app_type: Some(ApplicationDraft::TRADITIONAL.to_string()),
            is_third_party: true,
            oidc_client_metadata: Some(OidcClientMetadata {
                redirect_uris: vec!["https://portal.example/cb".to_string()],
                post_logout_redirect_uris: vec![],
            }),
            custom_data: json!({}),
        };

        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({
                "name": "portal.example",
                "description": "Portal",
                "type": "Traditional",
                "isThirdParty": true,
                "oidcClientMetadata": {
                    "redirectUris": ["https://portal.example/cb"],
                    "postLogoutRedirectUris": []
                },
                "customData": {}
            })
        );
    }

    #[test]
    fn test_connector_deserializes_camel_case() {
        let connector: RemoteConnector = serde_json::from_value(json!({
            "id": "c1",
            "connectorId": "simple-mail-transfer-protocol",
            "config": { "host": "smtp.example.com" },
            "metadata": {}
        }))
        .unwrap();

        assert_eq!(connector.connector_id, RemoteConnector::SMTP);
        assert_eq!(connector.config["host"], "smtp.example.com");
    }

    #[test]
    fn test_role_without_description() {
        let role: RemoteRole = serde_json::from_value(json!({"id": "1", "name": "Admin"})).unwrap();
        assert_eq!(role.description(), "");
    }
}
