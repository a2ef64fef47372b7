//! Resources phase: API resources and the scopes their actions imply

use std::collections::{HashMap, HashSet};

use rbac_directory::{RemoteResource, RemoteScope, ResourceDraft, ScopeDraft};
use rbac_model::{DesiredState, Resource};

use crate::error::{Error, Result};

use super::context::{FailureMode, PendingOp, PhaseContext};
use super::report::{EntityKind, OperationAction};

pub(crate) async fn sync_resources(ctx: &mut PhaseContext<'_>, desired: &DesiredState) -> Result<()> {
    let client = ctx.client;
    let remote = client
        .list_resources()
        .await
        .map_err(Error::fetch("resources"))?;
    let by_name: HashMap<&str, &RemoteResource> =
        remote.iter().map(|r| (r.name.as_str(), r)).collect();

    for resource in &desired.resources {
        let indicator = ctx.options.resource_indicator(&resource.name);

        let (resource_id, fresh) = match by_name.get(resource.name.as_str()) {
            Some(existing) if existing.indicator == indicator => (existing.id.clone(), false),
            Some(existing) if !ctx.options.cleanup => {
                tracing::warn!(
                    resource = %resource.name,
                    remote = %existing.indicator,
                    expected = %indicator,
                    "Resource indicator differs; enable cleanup to recreate it"
                );
                (existing.id.clone(), false)
            }
            Some(existing) => {
                let op = PendingOp::new(
                    EntityKind::Resource,
                    OperationAction::Delete,
                    &resource.name,
                    format!(
                        "Deleted resource {} to replace indicator {}",
                        resource.name, existing.indicator
                    ),
                );
                let outcome = client.delete_resource(&existing.id).await;
                ctx.record(op, FailureMode::Abort, outcome)?;
                (create_resource(ctx, resource, &indicator).await?, true)
            }
            None => (create_resource(ctx, resource, &indicator).await?, true),
        };

        sync_resource_scopes(ctx, resource, &resource_id, fresh).await?;
    }

    if ctx.options.cleanup {
        cleanup_resources(ctx, desired, &remote).await;
    }
    Ok(())
}

async fn create_resource(
    ctx: &mut PhaseContext<'_>,
    resource: &Resource,
    indicator: &str,
) -> Result<String> {
    let client = ctx.client;
    let draft = ResourceDraft::new(&resource.name, indicator);
    let op = PendingOp::new(
        EntityKind::Resource,
        OperationAction::Create,
        &resource.name,
        format!("Created resource {} ({})", resource.name, indicator),
    );
    let outcome = client.create_resource(&draft).await;
    let created = ctx.record(op, FailureMode::Abort, outcome)?;
    Ok(created.map(|r| r.id).unwrap_or_default())
}

/// Create missing scopes. With cleanup, also delete undeclared ones.
///
/// Existing scopes are matched by name only; their descriptions are left
/// alone.
async fn sync_resource_scopes(
    ctx: &mut PhaseContext<'_>,
    resource: &Resource,
    resource_id: &str,
    fresh: bool,
) -> Result<()> {
    let client = ctx.client;
    let remote: Vec<RemoteScope> = if fresh {
        Vec::new()
    } else {
        client
            .list_resource_scopes(resource_id)
            .await
            .map_err(Error::fetch(format!("scopes of resource {}", resource.name)))?
    };
    let existing: HashSet<&str> = remote.iter().map(|s| s.name.as_str()).collect();

    for action in &resource.actions {
        let name = resource.scope_name(action);
        if existing.contains(name.as_str()) {
            continue;
        }
        let draft = ScopeDraft {
            name: name.clone(),
            description: format!("Permission to {} {}", action, resource.name),
        };
        let op = PendingOp::new(
            EntityKind::Scope,
            OperationAction::Create,
            &name,
            format!("Created scope {} on resource {}", name, resource.name),
        );
        let outcome = client.create_resource_scope(resource_id, &draft).await;
        ctx.record(op, FailureMode::Abort, outcome)?;
    }

    if ctx.options.cleanup {
        let declared: HashSet<String> = resource.scope_names().into_iter().collect();
        for scope in &remote {
            if declared.contains(&scope.name) {
                continue;
            }
            if ctx
                .protections
                .resource_scopes
                .is_reserved(&scope.name, scope.description())
            {
                tracing::debug!(scope = %scope.name, "Keeping reserved scope");
                continue;
            }
            let op = PendingOp::new(
                EntityKind::Scope,
                OperationAction::Delete,
                &scope.name,
                format!("Deleted scope {} from resource {}", scope.name, resource.name),
            );
            let outcome = client.delete_resource_scope(resource_id, &scope.id).await;
            ctx.record(op, FailureMode::Advisory, outcome)?;
        }
    }
    Ok(())
}

async fn cleanup_resources(
    ctx: &mut PhaseContext<'_>,
    desired: &DesiredState,
    remote: &[RemoteResource],
) {
    let client = ctx.client;
    let declared: HashSet<&str> = desired.resources.iter().map(|r| r.name.as_str()).collect();

    for resource in remote {
        if declared.contains(resource.name.as_str()) {
            continue;
        }
        if resource.is_default
            || ctx
                .protections
                .resources
                .is_reserved(&resource.name, &resource.indicator)
        {
            tracing::debug!(resource = %resource.name, "Keeping reserved resource");
            continue;
        }
        let op = PendingOp::new(
            EntityKind::Resource,
            OperationAction::Delete,
            &resource.name,
            format!("Deleted resource {}", resource.name),
        );
        let outcome = client.delete_resource(&resource.id).await;
        // Advisory writes never return Err
        let _ = ctx.record(op, FailureMode::Advisory, outcome);
    }
}
