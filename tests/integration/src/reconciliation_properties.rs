//! Reconciliation properties
//!
//! Whole-engine scenarios run against the in-memory directory. Each test
//! pins one guarantee operators rely on: re-runs are free, dry runs touch
//! nothing, cleanup spares reserved entities, and one failing phase does
//! not stop the others.

use std::sync::Arc;

use pretty_assertions::assert_eq;

use rbac_core::{EntityKind, OperationAction, SyncEngine, SyncOptions, SyncResult};
use rbac_directory::RoleKind;
use rbac_model::DesiredState;
use rbac_test_utils::{DesiredStateBuilder, InMemoryDirectory};

// =============================================================================
// Test Infrastructure
// =============================================================================

const API_BASE: &str = "https://api.example.com/api";

fn options() -> SyncOptions {
    SyncOptions {
        api_base_url: API_BASE.to_string(),
        ..Default::default()
    }
}

async fn sync(directory: &Arc<InMemoryDirectory>, options: SyncOptions, desired: &DesiredState) -> SyncResult {
    SyncEngine::new(directory.clone(), options).sync(desired).await
}

/// `(type, action, resource)` of every operation, for order-sensitive comparisons.
fn trail(result: &SyncResult) -> Vec<(EntityKind, OperationAction, String)> {
    result
        .operations
        .iter()
        .map(|op| (op.entity, op.action, op.resource.clone()))
        .collect()
}

fn hierarchy() -> DesiredState {
    DesiredStateBuilder::new()
        .resource("systems", &["read", "manage"])
        .resource("backups", &["read", "restore"])
        .organization_role("Owner", 0, &["read:systems", "manage:systems"])
        .organization_role("Viewer", 1, &["read:systems"])
        .user_role("Support", 1, &["read:systems", "read:backups"])
        .user_role("Operator", 2, &["manage:systems", "restore:backups"])
        .application("portal.example.com", "Portal", &[])
        .build()
}

// =============================================================================
// Idempotence
// =============================================================================

#[tokio::test]
async fn test_second_run_writes_nothing() {
    let directory = Arc::new(InMemoryDirectory::new());
    let desired = hierarchy();

    let first = sync(&directory, options(), &desired).await;
    assert!(first.success, "{:?}", first.errors);
    assert!(first.summary.total_changes() > 0);

    directory.clear_writes();
    let second = sync(&directory, options(), &desired).await;

    assert!(second.success, "{:?}", second.errors);
    assert!(second.operations.is_empty(), "{:?}", trail(&second));
    assert_eq!(second.summary.total_changes(), 0);
    assert!(directory.writes().is_empty(), "{:?}", directory.writes());
}

#[tokio::test]
async fn test_rerun_after_partial_failure_converges() {
    let directory = Arc::new(InMemoryDirectory::new());
    let desired = hierarchy();
    directory.fail_on("create_role", "Operator");

    let first = sync(&directory, options(), &desired).await;
    assert!(!first.success);
    assert_eq!(directory.role_names(RoleKind::User), vec!["Support"]);

    // The remote error clears; only what is still missing gets written
    directory.clear_failures();
    directory.clear_writes();
    let second = sync(&directory, options(), &desired).await;

    assert!(second.success, "{:?}", second.errors);
    assert_eq!(
        directory.writes(),
        vec!["create_role Operator", "assign_role_scopes Operator"]
    );
    assert_eq!(
        directory.bound_scope_names(RoleKind::User, "Operator"),
        vec!["manage:systems", "restore:backups"]
    );

    directory.clear_writes();
    let third = sync(&directory, options(), &desired).await;
    assert!(third.operations.is_empty());
    assert!(directory.writes().is_empty());
}

// =============================================================================
// Convergence
// =============================================================================

#[tokio::test]
async fn test_bound_scopes_match_declared_permissions() {
    let directory = Arc::new(InMemoryDirectory::new());
    let initial = DesiredStateBuilder::new()
        .resource("systems", &["read", "manage", "legacy"])
        .user_role("Support", 1, &["read:systems", "legacy:systems"])
        .build();
    let first = sync(&directory, options(), &initial).await;
    assert!(first.success, "{:?}", first.errors);
    assert_eq!(
        directory.bound_scope_names(RoleKind::User, "Support"),
        vec!["legacy:systems", "read:systems"]
    );

    let revised = DesiredStateBuilder::new()
        .resource("systems", &["read", "manage", "legacy"])
        .user_role("Support", 1, &["read:systems", "manage:systems"])
        .build();
    let second = sync(&directory, options(), &revised).await;

    assert!(second.success, "{:?}", second.errors);
    assert_eq!(
        directory.bound_scope_names(RoleKind::User, "Support"),
        vec!["manage:systems", "read:systems"]
    );
    assert_eq!(second.summary.permissions_created, 1);
    assert_eq!(second.summary.permissions_deleted, 1);
}

#[tokio::test]
async fn test_management_scopes_survive_binding_sync() {
    let directory = Arc::new(InMemoryDirectory::new());
    let desired = DesiredStateBuilder::new()
        .resource("systems", &["read"])
        .resource("user-management", &["read"])
        .user_role("Support", 1, &["read:systems", "read:user-management"])
        .build();
    sync(&directory, options(), &desired).await;
    assert_eq!(
        directory.bound_scope_names(RoleKind::User, "Support"),
        vec!["read:systems", "read:user-management"]
    );

    let narrowed = DesiredStateBuilder::new()
        .resource("systems", &["read"])
        .resource("user-management", &["read"])
        .user_role("Support", 1, &["read:systems"])
        .build();
    let result = sync(&directory, options(), &narrowed).await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(
        directory.bound_scope_names(RoleKind::User, "Support"),
        vec!["read:systems", "read:user-management"]
    );
    assert_eq!(result.summary.permissions_deleted, 0);
}

// =============================================================================
// Name Matching
// =============================================================================

#[tokio::test]
async fn test_role_names_match_case_insensitively() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.seed_role(RoleKind::User, "Admin", "User role (Priority: 0)");
    let desired = DesiredStateBuilder::new().user_role("admin", 0, &[]).build();

    let result = sync(&directory, options(), &desired).await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(directory.role_names(RoleKind::User), vec!["Admin"]);
    assert_eq!(result.summary.roles_created, 0);
}

#[tokio::test]
async fn test_resource_names_match_exactly() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.seed_resource("Systems", &format!("{}/Systems", API_BASE), &[]);
    let desired = DesiredStateBuilder::new().resource("systems", &["read"]).build();

    let result = sync(&directory, options(), &desired).await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(directory.resource_names(), vec!["Systems", "systems"]);
    assert_eq!(result.summary.resources_created, 1);
}

// =============================================================================
// Dry Run
// =============================================================================

#[tokio::test]
async fn test_dry_run_has_no_side_effects() {
    let desired = hierarchy();

    let rehearsed = Arc::new(InMemoryDirectory::new());
    rehearsed.seed_role(RoleKind::User, "obsolete-role", "Old role");
    let dry = sync(
        &rehearsed,
        SyncOptions {
            dry_run: true,
            cleanup: true,
            ..options()
        },
        &desired,
    )
    .await;

    assert!(dry.success);
    assert!(dry.dry_run);
    assert!(dry.operations.is_empty());
    assert_eq!(dry.summary.total_changes(), 0);
    assert!(rehearsed.writes().is_empty());
    assert_eq!(rehearsed.role_names(RoleKind::User), vec!["obsolete-role"]);

    // A real run after the rehearsal matches a real run without one
    let control = Arc::new(InMemoryDirectory::new());
    control.seed_role(RoleKind::User, "obsolete-role", "Old role");
    let cleanup = SyncOptions {
        cleanup: true,
        ..options()
    };
    let after_dry = sync(&rehearsed, cleanup.clone(), &desired).await;
    let without_dry = sync(&control, cleanup, &desired).await;

    assert_eq!(trail(&after_dry), trail(&without_dry));
    assert_eq!(after_dry.summary, without_dry.summary);
}

// =============================================================================
// Cleanup Protection
// =============================================================================

#[tokio::test]
async fn test_cleanup_spares_reserved_roles() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.seed_role(RoleKind::User, "Logto Management", "Manage the tenant");
    directory.seed_role(RoleKind::User, "obsolete-role", "Old role");
    let desired = DesiredStateBuilder::new()
        .user_role("Support", 1, &[])
        .build();

    let result = sync(
        &directory,
        SyncOptions {
            cleanup: true,
            ..options()
        },
        &desired,
    )
    .await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(
        directory.role_names(RoleKind::User),
        vec!["Logto Management", "Support"]
    );
    assert_eq!(result.summary.roles_deleted, 1);
    let deleted: Vec<&str> = result
        .operations
        .iter()
        .filter(|op| op.action == OperationAction::Delete)
        .map(|op| op.resource.as_str())
        .collect();
    assert_eq!(deleted, vec!["obsolete-role"]);
}

#[tokio::test]
async fn test_no_deletes_without_cleanup() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.seed_role(RoleKind::User, "obsolete-role", "Old role");
    directory.seed_resource("obsolete", &format!("{}/obsolete", API_BASE), &["read:obsolete"]);
    directory.seed_organization_scope("legacy:things", "Organization scope: legacy:things");

    let result = sync(&directory, options(), &hierarchy()).await;

    assert!(result.success, "{:?}", result.errors);
    assert!(
        result
            .operations
            .iter()
            .all(|op| op.action != OperationAction::Delete)
    );
    assert!(directory.role_names(RoleKind::User).contains(&"obsolete-role".to_string()));
    assert!(directory.resource_names().contains(&"obsolete".to_string()));
}

// =============================================================================
// Partial Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_failed_phase_does_not_stop_later_phases() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.fail_on("create_role", "Owner");

    let result = sync(&directory, options(), &hierarchy()).await;

    assert!(!result.success);
    assert_eq!(result.errors.len(), 1, "{:?}", result.errors);
    assert!(result.errors[0].starts_with("Organization roles sync failed:"));

    let failed: Vec<_> = result.failed_operations().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].entity, EntityKind::OrganizationRole);
    assert_eq!(failed[0].resource, "Owner");
    assert!(failed[0].error.is_some());

    // User roles ran after the organization phase failed
    let user_roles: Vec<&str> = result
        .operations_on(EntityKind::UserRole)
        .map(|op| op.resource.as_str())
        .collect();
    assert_eq!(user_roles, vec!["Support", "Operator"]);
    assert_eq!(result.operations_on(EntityKind::UserRolePermission).count(), 2);
    assert!(result.operations_on(EntityKind::Application).count() > 0);
}

#[tokio::test]
async fn test_unreachable_directory_fails_every_enabled_phase() {
    let directory = Arc::new(InMemoryDirectory::new());
    directory.set_unreachable(true);

    let result = sync(
        &directory,
        SyncOptions {
            skip_roles: true,
            ..options()
        },
        &hierarchy(),
    )
    .await;

    assert!(!result.success);
    // Resources, organization scopes, applications
    assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
    assert!(result.operations.is_empty());
}

// =============================================================================
// Permission Resolution Tolerance
// =============================================================================

#[tokio::test]
async fn test_unresolvable_permission_is_skipped() {
    let directory = Arc::new(InMemoryDirectory::new());
    let desired = DesiredStateBuilder::new()
        .resource("systems", &["read"])
        .user_role("Support", 1, &["read:systems", "admin:billing"])
        .build();

    let result = sync(&directory, options(), &desired).await;

    assert!(result.success, "{:?}", result.errors);
    assert_eq!(directory.role_names(RoleKind::User), vec!["Support"]);
    assert_eq!(
        directory.bound_scope_names(RoleKind::User, "Support"),
        vec!["read:systems"]
    );
    assert_eq!(result.summary.permissions_created, 1);
}
