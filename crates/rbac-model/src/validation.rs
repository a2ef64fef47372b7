//! Desired-state validation
//!
//! Validation is split in two passes. Structural rules (required fields,
//! uniqueness, well-formed lists) are always fatal. Reference rules check
//! that names used in one section resolve in another; the CLI's `--force`
//! flag downgrades only those to warnings.

use std::collections::HashSet;

use crate::schema::{
    AccessControl, Application, DesiredState, Resource, Role, RoleType, SmtpConnector,
};

/// Permission prefixes accepted without a matching resource declaration.
pub const SYSTEM_PERMISSION_PREFIXES: &[&str] = &[
    "admin:", "manage:", "view:", "create:", "read:", "update:", "delete:", "destroy:", "audit:",
    "backup:",
];

/// A rule the desired state breaks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("metadata.{field} is required")]
    MissingMetadata { field: &'static str },

    #[error("{role_type} role ID is required")]
    MissingRoleId { role_type: RoleType },

    #[error("role name is required for {role_type} role {role}")]
    MissingRoleName { role_type: RoleType, role: String },

    #[error("invalid role type {value} for {role_type} role {role}")]
    InvalidRoleType {
        role_type: RoleType,
        role: String,
        value: String,
    },

    #[error("role priority must be non-negative for role {role} (got {priority})")]
    NegativePriority { role: String, priority: i64 },

    #[error("permission ID is required for role {role}")]
    MissingPermissionId { role: String },

    #[error("duplicate permission ID {permission} in role {role}")]
    DuplicatePermission { role: String, permission: String },

    #[error("duplicate {role_type} role ID: {role}")]
    DuplicateRoleId { role_type: RoleType, role: String },

    #[error("resource name is required")]
    MissingResourceName,

    #[error("resource {resource} must have at least one action")]
    NoActions { resource: String },

    #[error("empty action in resource {resource}")]
    EmptyAction { resource: String },

    #[error("duplicate action {action} in resource {resource}")]
    DuplicateAction { resource: String, action: String },

    #[error("duplicate resource name: {resource}")]
    DuplicateResource { resource: String },

    #[error("application name is required")]
    MissingApplicationName,

    #[error("application {field} is required for app {app}")]
    MissingApplicationField { app: String, field: &'static str },

    #[error("empty scope in application {app}")]
    EmptyApplicationScope { app: String },

    #[error("duplicate scope {scope} in application {app}")]
    DuplicateApplicationScope { app: String, scope: String },

    #[error("duplicate third-party app name: {app}")]
    DuplicateApplication { app: String },

    #[error("connectors.smtp.{field} is required")]
    MissingSmtpField { field: &'static str },

    #[error("invalid permission reference {permission} in {role_type} role {role}")]
    UnknownPermission {
        role_type: RoleType,
        role: String,
        permission: String,
    },

    #[error("empty {role_type} role in access control of application {app}")]
    EmptyAccessControlRole { app: String, role_type: RoleType },

    #[error("invalid {role_type} role {role} in access control of application {app}")]
    UnknownAccessControlRole {
        app: String,
        role_type: RoleType,
        role: String,
    },
}

impl ValidationError {
    /// True for failures that concern cross-section references rather than
    /// the shape of a single entry.
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            ValidationError::UnknownPermission { .. } | ValidationError::UnknownAccessControlRole { .. }
        )
    }
}

/// True when `permission` starts with one of [`SYSTEM_PERMISSION_PREFIXES`].
pub fn is_system_permission(permission: &str) -> bool {
    SYSTEM_PERMISSION_PREFIXES
        .iter()
        .any(|prefix| permission.starts_with(prefix))
}

/// Run every rule, structural first, stopping at the first failure.
pub fn validate(state: &DesiredState) -> Result<(), ValidationError> {
    validate_structure(state)?;
    match reference_errors(state).into_iter().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Structural rules only.
pub fn validate_structure(state: &DesiredState) -> Result<(), ValidationError> {
    if state.metadata.name.trim().is_empty() {
        return Err(ValidationError::MissingMetadata { field: "name" });
    }
    if state.metadata.version.trim().is_empty() {
        return Err(ValidationError::MissingMetadata { field: "version" });
    }

    validate_role_list(&state.organization_roles, RoleType::Organization)?;
    validate_role_list(&state.user_roles, RoleType::User)?;

    let mut resource_names = HashSet::new();
    for resource in &state.resources {
        validate_resource(resource)?;
        if !resource_names.insert(resource.name.as_str()) {
            return Err(ValidationError::DuplicateResource {
                resource: resource.name.clone(),
            });
        }
    }

    let mut app_names = HashSet::new();
    for app in &state.third_party_apps {
        validate_application(app)?;
        if !app_names.insert(app.name.as_str()) {
            return Err(ValidationError::DuplicateApplication {
                app: app.name.clone(),
            });
        }
    }

    if let Some(smtp) = state.smtp_connector() {
        validate_smtp(smtp)?;
    }

    Ok(())
}

/// Every reference failure, in document order.
pub fn reference_errors(state: &DesiredState) -> Vec<ValidationError> {
    let declared = state.declared_scope_names();
    let mut errors = Vec::new();

    for (roles, role_type) in [
        (&state.organization_roles, RoleType::Organization),
        (&state.user_roles, RoleType::User),
    ] {
        for role in roles {
            for permission in role.permission_ids() {
                if !declared.contains(permission) && !is_system_permission(permission) {
                    errors.push(ValidationError::UnknownPermission {
                        role_type,
                        role: role.id.clone(),
                        permission: permission.to_string(),
                    });
                }
            }
        }
    }

    for app in &state.third_party_apps {
        if let Some(access) = &app.access_control {
            errors.extend(access_control_errors(state, app, access));
        }
    }

    errors
}

fn validate_smtp(smtp: &SmtpConnector) -> Result<(), ValidationError> {
    for (field, value) in [("host", &smtp.host), ("from_email", &smtp.from_email)] {
        if value.trim().is_empty() {
            return Err(ValidationError::MissingSmtpField { field });
        }
    }
    Ok(())
}

fn validate_role_list(roles: &[Role], role_type: RoleType) -> Result<(), ValidationError> {
    let mut ids = HashSet::new();
    for role in roles {
        validate_role(role, role_type)?;
        if !ids.insert(role.id.as_str()) {
            return Err(ValidationError::DuplicateRoleId {
                role_type,
                role: role.id.clone(),
            });
        }
    }
    Ok(())
}

fn validate_role(role: &Role, role_type: RoleType) -> Result<(), ValidationError> {
    if role.id.trim().is_empty() {
        return Err(ValidationError::MissingRoleId { role_type });
    }
    if role.name.trim().is_empty() {
        return Err(ValidationError::MissingRoleName {
            role_type,
            role: role.id.clone(),
        });
    }

    // The tag may only restate the list the role is declared in.
    match RoleType::from_tag(&role.role_type, role_type) {
        Ok(t) if t == role_type => {}
        _ => {
            return Err(ValidationError::InvalidRoleType {
                role_type,
                role: role.id.clone(),
                value: role.role_type.clone(),
            });
        }
    }

    if role.priority < 0 {
        return Err(ValidationError::NegativePriority {
            role: role.id.clone(),
            priority: role.priority,
        });
    }

    let mut seen = HashSet::new();
    for permission in role.permission_ids() {
        if permission.trim().is_empty() {
            return Err(ValidationError::MissingPermissionId {
                role: role.id.clone(),
            });
        }
        if !seen.insert(permission) {
            return Err(ValidationError::DuplicatePermission {
                role: role.id.clone(),
                permission: permission.to_string(),
            });
        }
    }

    Ok(())
}

fn validate_resource(resource: &Resource) -> Result<(), ValidationError> {
    if resource.name.trim().is_empty() {
        return Err(ValidationError::MissingResourceName);
    }
    if resource.actions.is_empty() {
        return Err(ValidationError::NoActions {
            resource: resource.name.clone(),
        });
    }

    let mut seen = HashSet::new();
    for action in &resource.actions {
        if action.trim().is_empty() {
            return Err(ValidationError::EmptyAction {
                resource: resource.name.clone(),
            });
        }
        if !seen.insert(action.as_str()) {
            return Err(ValidationError::DuplicateAction {
                resource: resource.name.clone(),
                action: action.clone(),
            });
        }
    }

    Ok(())
}

fn validate_application(app: &Application) -> Result<(), ValidationError> {
    if app.name.trim().is_empty() {
        return Err(ValidationError::MissingApplicationName);
    }
    if app.description.trim().is_empty() {
        return Err(ValidationError::MissingApplicationField {
            app: app.name.clone(),
            field: "description",
        });
    }
    if app.display_name.trim().is_empty() {
        return Err(ValidationError::MissingApplicationField {
            app: app.name.clone(),
            field: "display_name",
        });
    }

    let mut seen = HashSet::new();
    for scope in &app.scopes {
        if scope.trim().is_empty() {
            return Err(ValidationError::EmptyApplicationScope {
                app: app.name.clone(),
            });
        }
        if !seen.insert(scope.as_str()) {
            return Err(ValidationError::DuplicateApplicationScope {
                app: app.name.clone(),
                scope: scope.clone(),
            });
        }
    }

    if let Some(access) = &app.access_control {
        for (ids, role_type) in [
            (&access.organization_roles, RoleType::Organization),
            (&access.user_roles, RoleType::User),
        ] {
            if ids.iter().any(|id| id.trim().is_empty()) {
                return Err(ValidationError::EmptyAccessControlRole {
                    app: app.name.clone(),
                    role_type,
                });
            }
        }
    }

    Ok(())
}

fn access_control_errors(
    state: &DesiredState,
    app: &Application,
    access: &AccessControl,
) -> Vec<ValidationError> {
    let org_ids: HashSet<&str> = state.organization_roles.iter().map(|r| r.id.as_str()).collect();
    let user_ids: HashSet<&str> = state.user_roles.iter().map(|r| r.id.as_str()).collect();

    let org = access
        .organization_roles
        .iter()
        .filter(|id| !org_ids.contains(id.as_str()))
        .map(|id| (RoleType::Organization, id));
    let user = access
        .user_roles
        .iter()
        .filter(|id| !user_ids.contains(id.as_str()))
        .map(|id| (RoleType::User, id));

    org.chain(user)
        .map(|(role_type, id)| ValidationError::UnknownAccessControlRole {
            app: app.name.clone(),
            role_type,
            role: id.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("admin:everything", true)]
    #[case("backup:tenant", true)]
    #[case("read:systems", true)]
    #[case("impersonate:users", false)]
    #[case("readsystems", false)]
    #[case("", false)]
    fn test_is_system_permission(#[case] permission: &str, #[case] expected: bool) {
        assert_eq!(is_system_permission(permission), expected);
    }

    #[test]
    fn test_reference_classification() {
        let reference = ValidationError::UnknownPermission {
            role_type: RoleType::User,
            role: "support".to_string(),
            permission: "fly:planes".to_string(),
        };
        assert!(reference.is_reference());
        assert!(!ValidationError::MissingResourceName.is_reference());
    }
}
