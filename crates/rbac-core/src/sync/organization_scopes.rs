//! Organization scopes phase
//!
//! Every permission any role grants becomes an organization scope of the
//! same name, so organization roles can bind it.

use std::collections::{HashMap, HashSet};

use rbac_directory::{RemoteScope, ScopeDraft};
use rbac_model::{DesiredState, Permission};

use crate::error::{Error, Result};

use super::context::{FailureMode, PendingOp, PhaseContext};
use super::report::{EntityKind, OperationAction};

/// Description stamped on organization scopes this engine owns.
pub fn organization_scope_description(permission: &Permission) -> String {
    let label = permission
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(&permission.id);
    format!("Organization scope: {}", label)
}

pub(crate) async fn sync_organization_scopes(
    ctx: &mut PhaseContext<'_>,
    desired: &DesiredState,
) -> Result<()> {
    let client = ctx.client;
    let remote = client
        .list_organization_scopes()
        .await
        .map_err(Error::fetch("organization scopes"))?;
    let by_name: HashMap<&str, &RemoteScope> =
        remote.iter().map(|s| (s.name.as_str(), s)).collect();

    let permissions = desired.all_permissions();
    for permission in &permissions {
        let description = organization_scope_description(permission);
        let draft = ScopeDraft {
            name: permission.id.clone(),
            description: description.clone(),
        };

        match by_name.get(permission.id.as_str()) {
            Some(existing) if existing.description() == description => {}
            Some(existing) => {
                let op = PendingOp::new(
                    EntityKind::OrganizationScope,
                    OperationAction::Update,
                    &permission.id,
                    format!("Updated organization scope {}", permission.id),
                );
                let outcome = client.update_organization_scope(&existing.id, &draft).await;
                ctx.record(op, FailureMode::Abort, outcome)?;
            }
            None => {
                let op = PendingOp::new(
                    EntityKind::OrganizationScope,
                    OperationAction::Create,
                    &permission.id,
                    format!("Created organization scope {}", permission.id),
                );
                let outcome = client.create_organization_scope(&draft).await;
                ctx.record(op, FailureMode::Abort, outcome)?;
            }
        }
    }

    if !ctx.options.cleanup {
        return Ok(());
    }

    let declared: HashSet<&str> = permissions.iter().map(|p| p.id.as_str()).collect();
    for scope in &remote {
        if declared.contains(scope.name.as_str()) {
            continue;
        }
        if ctx
            .protections
            .organization_scopes
            .is_reserved(&scope.name, scope.description())
        {
            tracing::debug!(scope = %scope.name, "Keeping reserved organization scope");
            continue;
        }
        let op = PendingOp::new(
            EntityKind::OrganizationScope,
            OperationAction::Delete,
            &scope.name,
            format!("Deleted organization scope {}", scope.name),
        );
        let outcome = client.delete_organization_scope(&scope.id).await;
        ctx.record(op, FailureMode::Advisory, outcome)?;
    }
    Ok(())
}
