//! [`InMemoryDirectory`]: a [`DirectoryClient`] backed by plain collections.
//!
//! Ids are sequential strings (`id-1`, `id-2`, ...). Every successful write
//! is appended to a log readable through [`InMemoryDirectory::writes`], so
//! tests can assert that a converged run issued none. Individual writes can
//! be made to fail with a 500 through [`InMemoryDirectory::fail_on`].

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Map, Value};

use rbac_directory::{
    ApplicationDraft, DirectoryClient, DirectoryError, RemoteApplication, RemoteConnector,
    RemoteResource, RemoteRole, RemoteScope, ResourceDraft, Result, RoleDraft, RoleKind,
    ScopeDraft, StatusCode,
};

/// Write target used for the tenant-wide sign-in experience.
pub const SIGN_IN_EXPERIENCE: &str = "sign-in-experience";

#[derive(Default)]
struct State {
    next_id: u64,
    unreachable: bool,
    resources: Vec<RemoteResource>,
    resource_scopes: HashMap<String, Vec<RemoteScope>>,
    organization_scopes: Vec<RemoteScope>,
    organization_roles: Vec<RemoteRole>,
    user_roles: Vec<RemoteRole>,
    bindings: HashMap<String, Vec<String>>,
    applications: Vec<RemoteApplication>,
    display_names: HashMap<String, String>,
    consent_scopes: HashMap<String, Vec<String>>,
    claims_script: Option<String>,
    sign_in_experience: Map<String, Value>,
    connectors: Vec<RemoteConnector>,
    failures: HashSet<(String, String)>,
    writes: Vec<String>,
}

impl State {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("id-{}", self.next_id)
    }

    fn roles(&self, kind: RoleKind) -> &Vec<RemoteRole> {
        match kind {
            RoleKind::Organization => &self.organization_roles,
            RoleKind::User => &self.user_roles,
        }
    }

    fn roles_mut(&mut self, kind: RoleKind) -> &mut Vec<RemoteRole> {
        match kind {
            RoleKind::Organization => &mut self.organization_roles,
            RoleKind::User => &mut self.user_roles,
        }
    }

    fn role_name(&self, kind: RoleKind, id: &str) -> String {
        self.roles(kind)
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Scope lookup across the catalog a role kind binds from.
    fn bindable_scope(&self, kind: RoleKind, id: &str) -> Option<&RemoteScope> {
        match kind {
            RoleKind::Organization => self.organization_scopes.iter().find(|s| s.id == id),
            RoleKind::User => self
                .resource_scopes
                .values()
                .flatten()
                .find(|s| s.id == id),
        }
    }

    fn app_name(&self, id: &str) -> String {
        self.applications
            .iter()
            .find(|a| a.id == id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| id.to_string())
    }

    /// Gate and log one write.
    fn write(&mut self, op: &str, target: &str) -> Result<()> {
        self.reachable()?;
        if self.failures.contains(&(op.to_string(), target.to_string())) {
            return Err(DirectoryError::Status {
                method: "POST".to_string(),
                path: format!("/{}", op),
                status: StatusCode::INTERNAL_SERVER_ERROR,
                body: format!("injected failure for {} {}", op, target),
            });
        }
        self.writes.push(format!("{} {}", op, target));
        Ok(())
    }

    fn reachable(&self) -> Result<()> {
        if self.unreachable {
            return Err(DirectoryError::Status {
                method: "GET".to_string(),
                path: "/".to_string(),
                status: StatusCode::SERVICE_UNAVAILABLE,
                body: "directory unreachable".to_string(),
            });
        }
        Ok(())
    }
}

fn not_found(path: String) -> DirectoryError {
    DirectoryError::Status {
        method: "GET".to_string(),
        path,
        status: StatusCode::NOT_FOUND,
        body: "entity not found".to_string(),
    }
}

/// In-memory identity directory.
#[derive(Default)]
pub struct InMemoryDirectory {
    state: Mutex<State>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    // =========================================================================
    // Scripting
    // =========================================================================

    /// Make the write `op` against `target` fail with a 500.
    ///
    /// `op` is the trait method name without its entity suffix, e.g.
    /// `create_role`, `delete_resource`, `assign_role_scopes`. `target` is
    /// the entity's name (role, resource, scope, or application name).
    pub fn fail_on(&self, op: &str, target: &str) {
        self.state()
            .failures
            .insert((op.to_string(), target.to_string()));
    }

    /// Forget every failure injected with [`InMemoryDirectory::fail_on`].
    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Make every call fail with a 503.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.state().unreachable = unreachable;
    }

    // =========================================================================
    // Seeding
    // =========================================================================

    /// Seed a resource with scopes; returns its id.
    pub fn seed_resource(&self, name: &str, indicator: &str, scopes: &[&str]) -> String {
        let mut state = self.state();
        let id = state.next_id();
        state.resources.push(RemoteResource {
            id: id.clone(),
            name: name.to_string(),
            indicator: indicator.to_string(),
            is_default: false,
            access_token_ttl: None,
        });
        let mut seeded = Vec::new();
        for scope in scopes {
            seeded.push(RemoteScope {
                id: state.next_id(),
                name: scope.to_string(),
                description: None,
            });
        }
        state.resource_scopes.insert(id.clone(), seeded);
        id
    }

    /// Seed the directory's default management resource.
    pub fn seed_management_resource(&self) -> String {
        let id = self.seed_resource(
            "Logto Management API",
            "https://default.logto.app/api",
            &["all"],
        );
        let mut state = self.state();
        if let Some(resource) = state.resources.iter_mut().find(|r| r.id == id) {
            resource.is_default = true;
        }
        id
    }

    pub fn seed_organization_scope(&self, name: &str, description: &str) -> String {
        let mut state = self.state();
        let id = state.next_id();
        state.organization_scopes.push(RemoteScope {
            id: id.clone(),
            name: name.to_string(),
            description: Some(description.to_string()),
        });
        id
    }

    pub fn seed_role(&self, kind: RoleKind, name: &str, description: &str) -> String {
        let mut state = self.state();
        let id = state.next_id();
        state.roles_mut(kind).push(RemoteRole {
            id: id.clone(),
            name: name.to_string(),
            description: Some(description.to_string()),
        });
        id
    }

    /// Bind scopes to a seeded role by scope id.
    pub fn seed_binding(&self, role_id: &str, scope_ids: &[&str]) {
        self.state()
            .bindings
            .entry(role_id.to_string())
            .or_default()
            .extend(scope_ids.iter().map(|s| s.to_string()));
    }

    pub fn seed_application(&self, name: &str, description: &str) -> String {
        let mut state = self.state();
        let id = state.next_id();
        state.applications.push(RemoteApplication {
            id: id.clone(),
            name: name.to_string(),
            description: Some(description.to_string()),
            app_type: Some(ApplicationDraft::TRADITIONAL.to_string()),
            is_third_party: true,
            oidc_client_metadata: None,
            custom_data: Value::Null,
        });
        id
    }

    pub fn seed_claims_script(&self, script: &str) {
        self.state().claims_script = Some(script.to_string());
    }

    /// Replace the sign-in experience settings. `settings` must be an object.
    pub fn seed_sign_in_experience(&self, settings: Value) {
        if let Value::Object(map) = settings {
            self.state().sign_in_experience = map;
        }
    }

    /// Seed a connector instance; returns its id.
    pub fn seed_connector(&self, connector_id: &str, config: Value) -> String {
        let mut state = self.state();
        let id = state.next_id();
        state.connectors.push(RemoteConnector {
            id: id.clone(),
            connector_id: connector_id.to_string(),
            config,
        });
        id
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Successful writes in order, as `"<op> <target>"`.
    pub fn writes(&self) -> Vec<String> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    pub fn resource_names(&self) -> Vec<String> {
        self.state().resources.iter().map(|r| r.name.clone()).collect()
    }

    pub fn resource(&self, name: &str) -> Option<RemoteResource> {
        self.state().resources.iter().find(|r| r.name == name).cloned()
    }

    /// Scope names of the resource called `resource`, sorted.
    pub fn resource_scope_names(&self, resource: &str) -> Vec<String> {
        let state = self.state();
        let Some(id) = state
            .resources
            .iter()
            .find(|r| r.name == resource)
            .map(|r| r.id.clone())
        else {
            return Vec::new();
        };
        let mut names: Vec<String> = state
            .resource_scopes
            .get(&id)
            .map(|scopes| scopes.iter().map(|s| s.name.clone()).collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    pub fn organization_scopes(&self) -> Vec<RemoteScope> {
        self.state().organization_scopes.clone()
    }

    pub fn roles(&self, kind: RoleKind) -> Vec<RemoteRole> {
        self.state().roles(kind).clone()
    }

    pub fn role_names(&self, kind: RoleKind) -> Vec<String> {
        self.roles(kind).into_iter().map(|r| r.name).collect()
    }

    /// Names of the scopes bound to the role called `role` (exact name), sorted.
    pub fn bound_scope_names(&self, kind: RoleKind, role: &str) -> Vec<String> {
        let state = self.state();
        let Some(role_id) = state
            .roles(kind)
            .iter()
            .find(|r| r.name == role)
            .map(|r| r.id.clone())
        else {
            return Vec::new();
        };
        let mut names: Vec<String> = state
            .bindings
            .get(&role_id)
            .into_iter()
            .flatten()
            .map(|id| {
                state
                    .bindable_scope(kind, id)
                    .map(|s| s.name.clone())
                    .unwrap_or_else(|| id.clone())
            })
            .collect();
        names.sort();
        names
    }

    pub fn application(&self, name: &str) -> Option<RemoteApplication> {
        self.state()
            .applications
            .iter()
            .find(|a| a.name == name)
            .cloned()
    }

    pub fn application_names(&self) -> Vec<String> {
        self.state()
            .applications
            .iter()
            .map(|a| a.name.clone())
            .collect()
    }

    pub fn display_name(&self, application: &str) -> Option<String> {
        let state = self.state();
        let id = state.applications.iter().find(|a| a.name == application)?.id.clone();
        state.display_names.get(&id).cloned()
    }

    pub fn consent_scopes(&self, application: &str) -> Vec<String> {
        let state = self.state();
        state
            .applications
            .iter()
            .find(|a| a.name == application)
            .and_then(|a| state.consent_scopes.get(&a.id).cloned())
            .unwrap_or_default()
    }

    pub fn claims_script(&self) -> Option<String> {
        self.state().claims_script.clone()
    }

    pub fn sign_in_experience(&self) -> Value {
        Value::Object(self.state().sign_in_experience.clone())
    }

    /// Connector instances created from the factory `connector_id`.
    pub fn connectors(&self, connector_id: &str) -> Vec<RemoteConnector> {
        self.state()
            .connectors
            .iter()
            .filter(|c| c.connector_id == connector_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl DirectoryClient for InMemoryDirectory {
    async fn ping(&self) -> Result<()> {
        self.state().reachable()
    }

    async fn list_resources(&self) -> Result<Vec<RemoteResource>> {
        let state = self.state();
        state.reachable()?;
        Ok(state.resources.clone())
    }

    async fn create_resource(&self, draft: &ResourceDraft) -> Result<RemoteResource> {
        let mut state = self.state();
        state.write("create_resource", &draft.name)?;
        let resource = RemoteResource {
            id: state.next_id(),
            name: draft.name.clone(),
            indicator: draft.indicator.clone(),
            is_default: false,
            access_token_ttl: Some(draft.access_token_ttl),
        };
        state.resources.push(resource.clone());
        Ok(resource)
    }

    async fn delete_resource(&self, resource_id: &str) -> Result<()> {
        let mut state = self.state();
        let Some(index) = state.resources.iter().position(|r| r.id == resource_id) else {
            return Err(not_found(format!("/resources/{}", resource_id)));
        };
        let name = state.resources[index].name.clone();
        state.write("delete_resource", &name)?;
        state.resources.remove(index);
        state.resource_scopes.remove(resource_id);
        Ok(())
    }

    async fn list_resource_scopes(&self, resource_id: &str) -> Result<Vec<RemoteScope>> {
        let state = self.state();
        state.reachable()?;
        Ok(state
            .resource_scopes
            .get(resource_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_resource_scope(
        &self,
        resource_id: &str,
        draft: &ScopeDraft,
    ) -> Result<RemoteScope> {
        let mut state = self.state();
        if !state.resources.iter().any(|r| r.id == resource_id) {
            return Err(not_found(format!("/resources/{}", resource_id)));
        }
        state.write("create_resource_scope", &draft.name)?;
        let scope = RemoteScope {
            id: state.next_id(),
            name: draft.name.clone(),
            description: Some(draft.description.clone()),
        };
        state
            .resource_scopes
            .entry(resource_id.to_string())
            .or_default()
            .push(scope.clone());
        Ok(scope)
    }

    async fn delete_resource_scope(&self, resource_id: &str, scope_id: &str) -> Result<()> {
        let mut state = self.state();
        let name = state
            .resource_scopes
            .get(resource_id)
            .and_then(|scopes| scopes.iter().find(|s| s.id == scope_id))
            .map(|s| s.name.clone())
            .ok_or_else(|| not_found(format!("/resources/{}/scopes/{}", resource_id, scope_id)))?;
        state.write("delete_resource_scope", &name)?;
        if let Some(scopes) = state.resource_scopes.get_mut(resource_id) {
            scopes.retain(|s| s.id != scope_id);
        }
        for bound in state.bindings.values_mut() {
            bound.retain(|id| id != scope_id);
        }
        Ok(())
    }

    async fn list_organization_scopes(&self) -> Result<Vec<RemoteScope>> {
        let state = self.state();
        state.reachable()?;
        Ok(state.organization_scopes.clone())
    }

    async fn create_organization_scope(&self, draft: &ScopeDraft) -> Result<RemoteScope> {
        let mut state = self.state();
        state.write("create_organization_scope", &draft.name)?;
        let scope = RemoteScope {
            id: state.next_id(),
            name: draft.name.clone(),
            description: Some(draft.description.clone()),
        };
        state.organization_scopes.push(scope.clone());
        Ok(scope)
    }

    async fn update_organization_scope(&self, scope_id: &str, draft: &ScopeDraft) -> Result<()> {
        let mut state = self.state();
        if !state.organization_scopes.iter().any(|s| s.id == scope_id) {
            return Err(not_found(format!("/organization-scopes/{}", scope_id)));
        }
        state.write("update_organization_scope", &draft.name)?;
        if let Some(scope) = state
            .organization_scopes
            .iter_mut()
            .find(|s| s.id == scope_id)
        {
            scope.name = draft.name.clone();
            scope.description = Some(draft.description.clone());
        }
        Ok(())
    }

    async fn delete_organization_scope(&self, scope_id: &str) -> Result<()> {
        let mut state = self.state();
        let name = state
            .organization_scopes
            .iter()
            .find(|s| s.id == scope_id)
            .map(|s| s.name.clone())
            .ok_or_else(|| not_found(format!("/organization-scopes/{}", scope_id)))?;
        state.write("delete_organization_scope", &name)?;
        state.organization_scopes.retain(|s| s.id != scope_id);
        for bound in state.bindings.values_mut() {
            bound.retain(|id| id != scope_id);
        }
        Ok(())
    }

    async fn list_roles(&self, kind: RoleKind) -> Result<Vec<RemoteRole>> {
        let state = self.state();
        state.reachable()?;
        Ok(state.roles(kind).clone())
    }

    async fn create_role(&self, kind: RoleKind, draft: &RoleDraft) -> Result<RemoteRole> {
        let mut state = self.state();
        state.write("create_role", &draft.name)?;
        let role = RemoteRole {
            id: state.next_id(),
            name: draft.name.clone(),
            description: Some(draft.description.clone()),
        };
        state.roles_mut(kind).push(role.clone());
        Ok(role)
    }

    async fn update_role(&self, kind: RoleKind, role_id: &str, draft: &RoleDraft) -> Result<()> {
        let mut state = self.state();
        if !state.roles(kind).iter().any(|r| r.id == role_id) {
            return Err(not_found(format!("/{}/{}", kind.collection(), role_id)));
        }
        state.write("update_role", &draft.name)?;
        if let Some(role) = state.roles_mut(kind).iter_mut().find(|r| r.id == role_id) {
            role.name = draft.name.clone();
            role.description = Some(draft.description.clone());
        }
        Ok(())
    }

    async fn delete_role(&self, kind: RoleKind, role_id: &str) -> Result<()> {
        let mut state = self.state();
        if !state.roles(kind).iter().any(|r| r.id == role_id) {
            return Err(not_found(format!("/{}/{}", kind.collection(), role_id)));
        }
        let name = state.role_name(kind, role_id);
        state.write("delete_role", &name)?;
        state.roles_mut(kind).retain(|r| r.id != role_id);
        state.bindings.remove(role_id);
        Ok(())
    }

    async fn list_role_scopes(&self, kind: RoleKind, role_id: &str) -> Result<Vec<RemoteScope>> {
        let state = self.state();
        state.reachable()?;
        if !state.roles(kind).iter().any(|r| r.id == role_id) {
            return Err(not_found(format!("/{}/{}/scopes", kind.collection(), role_id)));
        }
        Ok(state
            .bindings
            .get(role_id)
            .into_iter()
            .flatten()
            .map(|id| {
                state.bindable_scope(kind, id).cloned().unwrap_or(RemoteScope {
                    id: id.clone(),
                    name: String::new(),
                    description: None,
                })
            })
            .collect())
    }

    async fn assign_role_scopes(
        &self,
        kind: RoleKind,
        role_id: &str,
        scope_ids: &[String],
    ) -> Result<()> {
        let mut state = self.state();
        let name = state.role_name(kind, role_id);
        state.write("assign_role_scopes", &name)?;
        let bound = state.bindings.entry(role_id.to_string()).or_default();
        for id in scope_ids {
            if !bound.contains(id) {
                bound.push(id.clone());
            }
        }
        Ok(())
    }

    async fn remove_role_scopes(
        &self,
        kind: RoleKind,
        role_id: &str,
        scope_ids: &[String],
    ) -> Result<()> {
        let mut state = self.state();
        let name = state.role_name(kind, role_id);
        state.write("remove_role_scopes", &name)?;
        if let Some(bound) = state.bindings.get_mut(role_id) {
            bound.retain(|id| !scope_ids.contains(id));
        }
        Ok(())
    }

    async fn list_third_party_applications(&self) -> Result<Vec<RemoteApplication>> {
        let state = self.state();
        state.reachable()?;
        Ok(state
            .applications
            .iter()
            .filter(|a| a.is_third_party)
            .cloned()
            .collect())
    }

    async fn create_third_party_application(
        &self,
        draft: &ApplicationDraft,
    ) -> Result<RemoteApplication> {
        let mut state = self.state();
        state.write("create_application", &draft.name)?;
        let app = RemoteApplication {
            id: state.next_id(),
            name: draft.name.clone(),
            description: Some(draft.description.clone()),
            app_type: draft.app_type.clone(),
            is_third_party: draft.is_third_party,
            oidc_client_metadata: draft.oidc_client_metadata.clone(),
            custom_data: draft.custom_data.clone(),
        };
        state.applications.push(app.clone());
        Ok(app)
    }

    async fn update_third_party_application(
        &self,
        application_id: &str,
        draft: &ApplicationDraft,
    ) -> Result<()> {
        let mut state = self.state();
        if !state.applications.iter().any(|a| a.id == application_id) {
            return Err(not_found(format!("/applications/{}", application_id)));
        }
        state.write("update_application", &draft.name)?;
        if let Some(app) = state
            .applications
            .iter_mut()
            .find(|a| a.id == application_id)
        {
            app.name = draft.name.clone();
            app.description = Some(draft.description.clone());
            if let Some(app_type) = &draft.app_type {
                app.app_type = Some(app_type.clone());
            }
            app.oidc_client_metadata = draft.oidc_client_metadata.clone();
            app.custom_data = draft.custom_data.clone();
        }
        Ok(())
    }

    async fn delete_third_party_application(&self, application_id: &str) -> Result<()> {
        let mut state = self.state();
        if !state.applications.iter().any(|a| a.id == application_id) {
            return Err(not_found(format!("/applications/{}", application_id)));
        }
        let name = state.app_name(application_id);
        state.write("delete_application", &name)?;
        state.applications.retain(|a| a.id != application_id);
        state.display_names.remove(application_id);
        state.consent_scopes.remove(application_id);
        Ok(())
    }

    async fn get_application_display_name(&self, application_id: &str) -> Result<Option<String>> {
        let state = self.state();
        state.reachable()?;
        Ok(state.display_names.get(application_id).cloned())
    }

    async fn set_application_display_name(
        &self,
        application_id: &str,
        display_name: &str,
    ) -> Result<()> {
        let mut state = self.state();
        let name = state.app_name(application_id);
        state.write("set_application_display_name", &name)?;
        state
            .display_names
            .insert(application_id.to_string(), display_name.to_string());
        Ok(())
    }

    async fn get_application_consent_scopes(&self, application_id: &str) -> Result<Vec<String>> {
        let state = self.state();
        state.reachable()?;
        Ok(state
            .consent_scopes
            .get(application_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn set_application_consent_scopes(
        &self,
        application_id: &str,
        scopes: &[String],
    ) -> Result<()> {
        let mut state = self.state();
        let name = state.app_name(application_id);
        state.write("set_application_consent_scopes", &name)?;
        state
            .consent_scopes
            .insert(application_id.to_string(), scopes.to_vec());
        Ok(())
    }

    async fn get_access_token_claims_script(&self) -> Result<Option<String>> {
        let state = self.state();
        state.reachable()?;
        Ok(state.claims_script.clone())
    }

    async fn put_access_token_claims_script(&self, script: &str) -> Result<()> {
        let mut state = self.state();
        state.write("put_access_token_claims_script", "custom-jwt-claims")?;
        state.claims_script = Some(script.to_string());
        Ok(())
    }

    async fn get_sign_in_experience(&self) -> Result<Value> {
        let state = self.state();
        state.reachable()?;
        Ok(Value::Object(state.sign_in_experience.clone()))
    }

    /// Top-level keys of `patch` replace the stored ones.
    async fn update_sign_in_experience(&self, patch: &Value) -> Result<()> {
        let mut state = self.state();
        state.write("update_sign_in_experience", SIGN_IN_EXPERIENCE)?;
        if let Value::Object(fields) = patch {
            for (key, value) in fields {
                state.sign_in_experience.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    async fn list_connectors(&self) -> Result<Vec<RemoteConnector>> {
        let state = self.state();
        state.reachable()?;
        Ok(state.connectors.clone())
    }

    async fn create_connector(
        &self,
        connector_id: &str,
        config: &Value,
    ) -> Result<RemoteConnector> {
        let mut state = self.state();
        state.write("create_connector", connector_id)?;
        let connector = RemoteConnector {
            id: state.next_id(),
            connector_id: connector_id.to_string(),
            config: config.clone(),
        };
        state.connectors.push(connector.clone());
        Ok(connector)
    }

    async fn update_connector(&self, id: &str, config: &Value) -> Result<()> {
        let mut state = self.state();
        let Some(index) = state.connectors.iter().position(|c| c.id == id) else {
            return Err(not_found(format!("/connectors/{}", id)));
        };
        let connector_id = state.connectors[index].connector_id.clone();
        state.write("update_connector", &connector_id)?;
        state.connectors[index].config = config.clone();
        Ok(())
    }
}
