//! Role phases and role-binding phases
//!
//! Organization and user roles reconcile through the same routines,
//! parameterized by [`RoleFlavor`]. They differ in which directory
//! collection they address, the description they carry, and which scopes
//! their bindings draw from.

use std::collections::{HashMap, HashSet};

use rbac_directory::{RemoteResource, RoleDraft, RoleKind};
use rbac_model::{DesiredState, Role, RoleType};

use crate::error::{Error, Result};

use super::context::{FailureMode, PendingOp, PhaseContext};
use super::mapping::{ScopeCatalog, diff_bindings, roles_by_name};
use super::protection::{ProtectionPolicy, Protections};
use super::report::{EntityKind, OperationAction};

/// Which half of the role hierarchy a phase reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleFlavor {
    Organization,
    User,
}

impl RoleFlavor {
    pub fn kind(self) -> RoleKind {
        match self {
            RoleFlavor::Organization => RoleKind::Organization,
            RoleFlavor::User => RoleKind::User,
        }
    }

    pub fn role_type(self) -> RoleType {
        match self {
            RoleFlavor::Organization => RoleType::Organization,
            RoleFlavor::User => RoleType::User,
        }
    }

    pub fn role_entity(self) -> EntityKind {
        match self {
            RoleFlavor::Organization => EntityKind::OrganizationRole,
            RoleFlavor::User => EntityKind::UserRole,
        }
    }

    pub fn binding_entity(self) -> EntityKind {
        match self {
            RoleFlavor::Organization => EntityKind::OrganizationRoleScope,
            RoleFlavor::User => EntityKind::UserRolePermission,
        }
    }

    /// Canonical remote description for a desired role.
    pub fn description(self, role: &Role) -> String {
        match self {
            RoleFlavor::Organization => format!("Organization role: {}", role.name),
            RoleFlavor::User => format!("User role (Priority: {})", role.priority),
        }
    }

    fn policy(self, protections: &Protections) -> &dyn ProtectionPolicy {
        match self {
            RoleFlavor::Organization => protections.organization_roles.as_ref(),
            RoleFlavor::User => protections.user_roles.as_ref(),
        }
    }

    fn noun(self) -> &'static str {
        match self {
            RoleFlavor::Organization => "organization role",
            RoleFlavor::User => "user role",
        }
    }
}

/// Create missing roles and refresh stale descriptions. With cleanup,
/// delete undeclared roles the protection policy does not reserve.
pub(crate) async fn sync_roles(
    ctx: &mut PhaseContext<'_>,
    desired: &DesiredState,
    flavor: RoleFlavor,
) -> Result<()> {
    let client = ctx.client;
    let kind = flavor.kind();
    let remote = client
        .list_roles(kind)
        .await
        .map_err(Error::fetch(format!("{} roles", kind)))?;
    let by_name = roles_by_name(&remote);
    let roles = desired.roles_of(flavor.role_type());

    for role in &roles {
        let description = flavor.description(role);

        match by_name.get(&role.name.to_lowercase()) {
            Some(existing) if existing.description() == description => {
                tracing::debug!(role = %role.name, "Role up to date");
            }
            Some(existing) => {
                // The remote spelling of the name is kept
                let draft = RoleDraft {
                    name: existing.name.clone(),
                    description,
                };
                let op = PendingOp::new(
                    flavor.role_entity(),
                    OperationAction::Update,
                    &role.name,
                    format!("Updated {} {}", flavor.noun(), role.name),
                );
                let outcome = client.update_role(kind, &existing.id, &draft).await;
                ctx.record(op, FailureMode::Abort, outcome)?;
            }
            None => {
                let draft = RoleDraft {
                    name: role.name.clone(),
                    description,
                };
                let op = PendingOp::new(
                    flavor.role_entity(),
                    OperationAction::Create,
                    &role.name,
                    format!("Created {} {}", flavor.noun(), role.name),
                );
                let outcome = client.create_role(kind, &draft).await;
                ctx.record(op, FailureMode::Abort, outcome)?;
            }
        }
    }

    if !ctx.options.cleanup {
        return Ok(());
    }

    let declared: HashSet<String> = roles.iter().map(|r| r.name.to_lowercase()).collect();
    for existing in &remote {
        if declared.contains(&existing.name.to_lowercase()) {
            continue;
        }
        if flavor
            .policy(ctx.protections)
            .is_reserved(&existing.name, existing.description())
        {
            tracing::debug!(role = %existing.name, "Keeping reserved role");
            continue;
        }
        let op = PendingOp::new(
            flavor.role_entity(),
            OperationAction::Delete,
            &existing.name,
            format!("Deleted {} {}", flavor.noun(), existing.name),
        );
        let outcome = client.delete_role(kind, &existing.id).await;
        ctx.record(op, FailureMode::Advisory, outcome)?;
    }
    Ok(())
}

/// Bring each declared role's bound scopes in line with its permissions.
pub(crate) async fn sync_role_bindings(
    ctx: &mut PhaseContext<'_>,
    desired: &DesiredState,
    flavor: RoleFlavor,
) -> Result<()> {
    let client = ctx.client;
    let kind = flavor.kind();
    let remote = client
        .list_roles(kind)
        .await
        .map_err(Error::fetch(format!("{} roles", kind)))?;
    let by_name = roles_by_name(&remote);
    let catalog = scope_catalog(ctx, desired, flavor).await?;

    for role in desired.roles_of(flavor.role_type()) {
        let Some(remote_role) = by_name.get(&role.name.to_lowercase()) else {
            tracing::warn!(role = %role.name, "Role not found in directory; skipping its permissions");
            continue;
        };

        let (wanted, unresolved) = catalog.resolve(role.permission_ids());
        for permission in unresolved {
            tracing::warn!(
                role = %role.name,
                permission = %permission,
                "Permission does not resolve to a known scope; skipping it"
            );
        }

        let current: Vec<String> = client
            .list_role_scopes(kind, &remote_role.id)
            .await
            .map_err(Error::fetch(format!("scopes of {} {}", flavor.noun(), role.name)))?
            .into_iter()
            .map(|s| s.id)
            .collect();

        let diff = diff_bindings(
            &wanted,
            &current,
            &catalog,
            ctx.protections.bound_scopes.as_ref(),
        );

        if !diff.to_add.is_empty() {
            let count = diff.to_add.len();
            let op = PendingOp::new(
                flavor.binding_entity(),
                OperationAction::Assign,
                format!("{} ({} permissions)", role.name, count),
                format!("Assigned {} permissions to {} {}", count, flavor.noun(), role.name),
            )
            .counting(count);
            let outcome = client
                .assign_role_scopes(kind, &remote_role.id, &diff.to_add)
                .await;
            ctx.record(op, FailureMode::Abort, outcome)?;
        }

        if !diff.to_remove.is_empty() {
            let count = diff.to_remove.len();
            let op = PendingOp::new(
                flavor.binding_entity(),
                OperationAction::Remove,
                format!("{} ({} permissions)", role.name, count),
                format!("Removed {} permissions from {} {}", count, flavor.noun(), role.name),
            )
            .counting(count);
            let outcome = client
                .remove_role_scopes(kind, &remote_role.id, &diff.to_remove)
                .await;
            ctx.record(op, FailureMode::Advisory, outcome)?;
        }
    }
    Ok(())
}

/// Scopes a role of `flavor` may bind.
///
/// Organization roles bind organization scopes. User roles bind the scopes
/// of the desired resources; a resource missing from the directory is
/// skipped with a warning.
async fn scope_catalog(
    ctx: &PhaseContext<'_>,
    desired: &DesiredState,
    flavor: RoleFlavor,
) -> Result<ScopeCatalog> {
    let client = ctx.client;
    match flavor {
        RoleFlavor::Organization => {
            let scopes = client
                .list_organization_scopes()
                .await
                .map_err(Error::fetch("organization scopes"))?;
            Ok(ScopeCatalog::from_scopes(&scopes))
        }
        RoleFlavor::User => {
            let resources = client
                .list_resources()
                .await
                .map_err(Error::fetch("resources"))?;
            let by_name: HashMap<&str, &RemoteResource> =
                resources.iter().map(|r| (r.name.as_str(), r)).collect();

            let mut catalog = ScopeCatalog::new();
            for resource in &desired.resources {
                let Some(remote) = by_name.get(resource.name.as_str()) else {
                    tracing::warn!(
                        resource = %resource.name,
                        "Resource not found in directory; its scopes are unavailable"
                    );
                    continue;
                };
                let scopes = client
                    .list_resource_scopes(&remote.id)
                    .await
                    .map_err(Error::fetch(format!("scopes of resource {}", resource.name)))?;
                catalog.extend(&scopes);
            }
            Ok(catalog)
        }
    }
}
