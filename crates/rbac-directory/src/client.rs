//! The directory client seam
//!
//! The reconciliation engine reaches the directory only through
//! [`DirectoryClient`]. [`crate::HttpDirectoryClient`] talks to a live
//! management API; tests substitute an in-memory implementation.

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;
use crate::types::{
    ApplicationDraft, RemoteApplication, RemoteConnector, RemoteResource, RemoteRole, RemoteScope,
    ResourceDraft, RoleDraft, RoleKind, ScopeDraft,
};

/// Management operations against an identity directory.
///
/// List operations return complete collections; implementations unwrap any
/// paging themselves.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Verify the directory is reachable with the configured credentials.
    async fn ping(&self) -> Result<()>;

    // Resources and their scopes

    async fn list_resources(&self) -> Result<Vec<RemoteResource>>;

    async fn create_resource(&self, draft: &ResourceDraft) -> Result<RemoteResource>;

    async fn delete_resource(&self, resource_id: &str) -> Result<()>;

    async fn list_resource_scopes(&self, resource_id: &str) -> Result<Vec<RemoteScope>>;

    async fn create_resource_scope(
        &self,
        resource_id: &str,
        draft: &ScopeDraft,
    ) -> Result<RemoteScope>;

    async fn delete_resource_scope(&self, resource_id: &str, scope_id: &str) -> Result<()>;

    // Organization scopes

    async fn list_organization_scopes(&self) -> Result<Vec<RemoteScope>>;

    async fn create_organization_scope(&self, draft: &ScopeDraft) -> Result<RemoteScope>;

    async fn update_organization_scope(&self, scope_id: &str, draft: &ScopeDraft) -> Result<()>;

    async fn delete_organization_scope(&self, scope_id: &str) -> Result<()>;

    // Roles and their bound scopes
    //
    // Organization roles bind organization scopes; user roles bind
    // resource scopes.

    async fn list_roles(&self, kind: RoleKind) -> Result<Vec<RemoteRole>>;

    async fn create_role(&self, kind: RoleKind, draft: &RoleDraft) -> Result<RemoteRole>;

    async fn update_role(&self, kind: RoleKind, role_id: &str, draft: &RoleDraft) -> Result<()>;

    async fn delete_role(&self, kind: RoleKind, role_id: &str) -> Result<()>;

    async fn list_role_scopes(&self, kind: RoleKind, role_id: &str) -> Result<Vec<RemoteScope>>;

    async fn assign_role_scopes(
        &self,
        kind: RoleKind,
        role_id: &str,
        scope_ids: &[String],
    ) -> Result<()>;

    async fn remove_role_scopes(
        &self,
        kind: RoleKind,
        role_id: &str,
        scope_ids: &[String],
    ) -> Result<()>;

    // Third-party applications

    async fn list_third_party_applications(&self) -> Result<Vec<RemoteApplication>>;

    async fn create_third_party_application(
        &self,
        draft: &ApplicationDraft,
    ) -> Result<RemoteApplication>;

    async fn update_third_party_application(
        &self,
        application_id: &str,
        draft: &ApplicationDraft,
    ) -> Result<()>;

    async fn delete_third_party_application(&self, application_id: &str) -> Result<()>;

    /// Branding display name shown on the consent screen, if set.
    async fn get_application_display_name(&self, application_id: &str) -> Result<Option<String>>;

    async fn set_application_display_name(
        &self,
        application_id: &str,
        display_name: &str,
    ) -> Result<()>;

    async fn get_application_consent_scopes(&self, application_id: &str) -> Result<Vec<String>>;

    async fn set_application_consent_scopes(
        &self,
        application_id: &str,
        scopes: &[String],
    ) -> Result<()>;

    // Customizations

    /// The access-token claims script, or `None` when none is configured.
    async fn get_access_token_claims_script(&self) -> Result<Option<String>>;

    async fn put_access_token_claims_script(&self, script: &str) -> Result<()>;

    /// The tenant's sign-in experience settings as the directory reports them.
    async fn get_sign_in_experience(&self) -> Result<Value>;

    /// Merge `patch` into the sign-in experience settings.
    async fn update_sign_in_experience(&self, patch: &Value) -> Result<()>;

    // Connectors

    async fn list_connectors(&self) -> Result<Vec<RemoteConnector>>;

    async fn create_connector(
        &self,
        connector_id: &str,
        config: &Value,
    ) -> Result<RemoteConnector>;

    async fn update_connector(&self, id: &str, config: &Value) -> Result<()>;
}
