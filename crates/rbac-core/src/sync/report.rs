//! Reconciliation results
//!
//! A [`SyncResult`] is the audit trail of one run: one [`SyncOperation`] per
//! attempted write, roll-up counters in [`Summary`], and one error string
//! per failed phase.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Category of directory entity an operation touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Resource,
    Scope,
    OrganizationScope,
    OrganizationRole,
    OrganizationRoleScope,
    UserRole,
    UserRolePermission,
    Application,
    Customization,
    SignInExperience,
    Connector,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Resource => "resource",
            EntityKind::Scope => "scope",
            EntityKind::OrganizationScope => "organization-scope",
            EntityKind::OrganizationRole => "organization-role",
            EntityKind::OrganizationRoleScope => "organization-role-scope",
            EntityKind::UserRole => "user-role",
            EntityKind::UserRolePermission => "user-role-permission",
            EntityKind::Application => "application",
            EntityKind::Customization => "customization",
            EntityKind::SignInExperience => "sign-in-experience",
            EntityKind::Connector => "connector",
        };
        f.write_str(s)
    }
}

/// What an operation did to its entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationAction {
    Create,
    Update,
    Delete,
    Assign,
    Remove,
}

impl fmt::Display for OperationAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationAction::Create => "create",
            OperationAction::Update => "update",
            OperationAction::Delete => "delete",
            OperationAction::Assign => "assign",
            OperationAction::Remove => "remove",
        };
        f.write_str(s)
    }
}

/// One attempted write. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncOperation {
    #[serde(rename = "type")]
    pub entity: EntityKind,
    pub action: OperationAction,
    /// Name of the entity written, e.g. a role name or scope name.
    pub resource: String,
    pub description: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Per-category counters of successful writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub resources_created: usize,
    pub resources_updated: usize,
    pub resources_deleted: usize,
    pub roles_created: usize,
    pub roles_updated: usize,
    pub roles_deleted: usize,
    pub permissions_created: usize,
    pub permissions_updated: usize,
    pub permissions_deleted: usize,
    /// Resource scopes.
    pub scopes_created: usize,
    pub scopes_updated: usize,
    pub scopes_deleted: usize,
    pub organization_scopes_created: usize,
    pub organization_scopes_updated: usize,
    pub organization_scopes_deleted: usize,
    pub applications_created: usize,
    pub applications_updated: usize,
    pub applications_deleted: usize,
    pub customizations_updated: usize,
    pub sign_in_experience_updated: usize,
    /// Connectors created or updated.
    pub connectors_synced: usize,
}

impl Summary {
    /// Add `count` successful writes of `action` on `entity`.
    ///
    /// Binding assigns and removals count as permissions created and
    /// deleted.
    pub fn tally(&mut self, entity: EntityKind, action: OperationAction, count: usize) {
        use EntityKind as E;
        use OperationAction as A;

        let counter = match (entity, action) {
            (E::Resource, A::Create) => &mut self.resources_created,
            (E::Resource, A::Update) => &mut self.resources_updated,
            (E::Resource, A::Delete) => &mut self.resources_deleted,
            (E::Scope, A::Create) => &mut self.scopes_created,
            (E::Scope, A::Update) => &mut self.scopes_updated,
            (E::Scope, A::Delete) => &mut self.scopes_deleted,
            (E::OrganizationScope, A::Create) => &mut self.organization_scopes_created,
            (E::OrganizationScope, A::Update) => &mut self.organization_scopes_updated,
            (E::OrganizationScope, A::Delete) => &mut self.organization_scopes_deleted,
            (E::OrganizationRole | E::UserRole, A::Create) => &mut self.roles_created,
            (E::OrganizationRole | E::UserRole, A::Update) => &mut self.roles_updated,
            (E::OrganizationRole | E::UserRole, A::Delete) => &mut self.roles_deleted,
            (E::OrganizationRoleScope | E::UserRolePermission, A::Assign) => {
                &mut self.permissions_created
            }
            (E::OrganizationRoleScope | E::UserRolePermission, A::Remove) => {
                &mut self.permissions_deleted
            }
            (E::Application, A::Create) => &mut self.applications_created,
            (E::Application, A::Update) => &mut self.applications_updated,
            (E::Application, A::Delete) => &mut self.applications_deleted,
            (E::Customization, _) => &mut self.customizations_updated,
            (E::SignInExperience, _) => &mut self.sign_in_experience_updated,
            (E::Connector, A::Create | A::Update) => &mut self.connectors_synced,
            _ => return,
        };
        *counter += count;
    }

    /// Total successful writes across every category.
    pub fn total_changes(&self) -> usize {
        self.resources_created
            + self.resources_updated
            + self.resources_deleted
            + self.roles_created
            + self.roles_updated
            + self.roles_deleted
            + self.permissions_created
            + self.permissions_updated
            + self.permissions_deleted
            + self.scopes_created
            + self.scopes_updated
            + self.scopes_deleted
            + self.organization_scopes_created
            + self.organization_scopes_updated
            + self.organization_scopes_deleted
            + self.applications_created
            + self.applications_updated
            + self.applications_deleted
            + self.customizations_updated
            + self.sign_in_experience_updated
            + self.connectors_synced
    }
}

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(serialize_with = "serialize_duration")]
    pub duration: Duration,
    pub dry_run: bool,
    /// True iff no phase recorded an error.
    pub success: bool,
    pub summary: Summary,
    pub operations: Vec<SyncOperation>,
    pub errors: Vec<String>,
}

impl SyncResult {
    /// Start a result clock.
    pub fn begin(dry_run: bool) -> Self {
        let now = Utc::now();
        Self {
            start_time: now,
            end_time: now,
            duration: Duration::ZERO,
            dry_run,
            success: true,
            summary: Summary::default(),
            operations: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Stop the clock and settle the success flag.
    pub fn finish(&mut self) {
        self.end_time = Utc::now();
        self.duration = (self.end_time - self.start_time).to_std().unwrap_or_default();
        self.success = self.errors.is_empty();
    }

    /// Operations that failed.
    pub fn failed_operations(&self) -> impl Iterator<Item = &SyncOperation> {
        self.operations.iter().filter(|op| !op.success)
    }

    /// Operations on one entity category.
    pub fn operations_on(&self, entity: EntityKind) -> impl Iterator<Item = &SyncOperation> {
        self.operations.iter().filter(move |op| op.entity == entity)
    }
}

fn serialize_duration<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:?}", duration))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case(EntityKind::Resource, OperationAction::Create, "resources_created")]
    #[case(EntityKind::Scope, OperationAction::Delete, "scopes_deleted")]
    #[case(EntityKind::OrganizationScope, OperationAction::Update, "organization_scopes_updated")]
    #[case(EntityKind::UserRole, OperationAction::Create, "roles_created")]
    #[case(EntityKind::OrganizationRole, OperationAction::Delete, "roles_deleted")]
    #[case(EntityKind::UserRolePermission, OperationAction::Assign, "permissions_created")]
    #[case(EntityKind::OrganizationRoleScope, OperationAction::Remove, "permissions_deleted")]
    #[case(EntityKind::Application, OperationAction::Update, "applications_updated")]
    #[case(EntityKind::Customization, OperationAction::Update, "customizations_updated")]
    #[case(EntityKind::SignInExperience, OperationAction::Update, "sign_in_experience_updated")]
    #[case(EntityKind::Connector, OperationAction::Create, "connectors_synced")]
    #[case(EntityKind::Connector, OperationAction::Update, "connectors_synced")]
    fn test_tally_targets_counter(
        #[case] entity: EntityKind,
        #[case] action: OperationAction,
        #[case] field: &str,
    ) {
        let mut summary = Summary::default();
        summary.tally(entity, action, 3);

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json[field], 3);
        assert_eq!(summary.total_changes(), 3);
    }

    #[test]
    fn test_finish_sets_success_from_errors() {
        let mut result = SyncResult::begin(false);
        result.finish();
        assert!(result.success);

        let mut result = SyncResult::begin(false);
        result.errors.push("User roles sync failed: boom".to_string());
        result.finish();
        assert!(!result.success);
        assert!(result.end_time >= result.start_time);
    }

    #[test]
    fn test_operation_serialization_shape() {
        let op = SyncOperation {
            entity: EntityKind::OrganizationRoleScope,
            action: OperationAction::Assign,
            resource: "Owner (2 permissions)".to_string(),
            description: "Assigned 2 scopes to organization role Owner".to_string(),
            success: true,
            error: None,
            timestamp: Utc::now(),
        };

        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "organization-role-scope");
        assert_eq!(json["action"], "assign");
        assert!(json.get("error").is_none());
    }
}
