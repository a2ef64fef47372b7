//! Phase descriptors
//!
//! Reconciliation runs as a fixed sequence of phases. Execution is strictly
//! sequential; `depends_on` records why the order is what it is and lets
//! tests check that no phase precedes its prerequisites.

use std::fmt;

use rbac_model::DesiredState;

use super::options::SyncOptions;

/// One reconciliation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Resources,
    OrganizationScopes,
    OrganizationRoles,
    OrganizationRoleScopes,
    UserRoles,
    UserRolePermissions,
    Applications,
    Customizations,
    SignInExperience,
    SmtpConnector,
}

/// Static description of a phase.
#[derive(Debug)]
pub struct PhaseDescriptor {
    pub phase: Phase,
    /// Label used in logs and phase error strings.
    pub label: &'static str,
    /// Phases whose entities this phase references.
    pub depends_on: &'static [Phase],
}

/// All phases in execution order.
pub const PHASES: &[PhaseDescriptor] = &[
    PhaseDescriptor {
        phase: Phase::Resources,
        label: "Resources",
        depends_on: &[],
    },
    PhaseDescriptor {
        phase: Phase::OrganizationScopes,
        label: "Organization scopes",
        depends_on: &[],
    },
    PhaseDescriptor {
        phase: Phase::OrganizationRoles,
        label: "Organization roles",
        depends_on: &[],
    },
    PhaseDescriptor {
        phase: Phase::OrganizationRoleScopes,
        label: "Organization role scopes",
        depends_on: &[Phase::OrganizationScopes, Phase::OrganizationRoles],
    },
    PhaseDescriptor {
        phase: Phase::UserRoles,
        label: "User roles",
        depends_on: &[],
    },
    PhaseDescriptor {
        phase: Phase::UserRolePermissions,
        label: "User role permissions",
        depends_on: &[Phase::Resources, Phase::UserRoles],
    },
    PhaseDescriptor {
        phase: Phase::Applications,
        label: "Third-party applications",
        depends_on: &[Phase::OrganizationRoles, Phase::UserRoles],
    },
    PhaseDescriptor {
        phase: Phase::Customizations,
        label: "Customizations",
        depends_on: &[],
    },
    PhaseDescriptor {
        phase: Phase::SignInExperience,
        label: "Sign-in experience",
        depends_on: &[],
    },
    PhaseDescriptor {
        phase: Phase::SmtpConnector,
        label: "SMTP connector",
        depends_on: &[],
    },
];

impl Phase {
    pub fn descriptor(self) -> &'static PhaseDescriptor {
        // PHASES lists every variant exactly once
        PHASES
            .iter()
            .find(|d| d.phase == self)
            .unwrap_or(&PHASES[0])
    }

    pub fn label(self) -> &'static str {
        self.descriptor().label
    }

    /// Whether the options and desired state call for this phase.
    ///
    /// Skipping roles also skips their binding phases; skipping permissions
    /// skips organization scopes and both binding phases.
    pub fn is_enabled(self, options: &SyncOptions, desired: &DesiredState) -> bool {
        match self {
            Phase::Resources => !options.skip_resources,
            Phase::OrganizationScopes => !options.skip_permissions,
            Phase::OrganizationRoles | Phase::UserRoles => !options.skip_roles,
            Phase::OrganizationRoleScopes | Phase::UserRolePermissions => {
                !options.skip_roles && !options.skip_permissions
            }
            Phase::Applications => !desired.third_party_apps.is_empty(),
            Phase::Customizations => desired.enabled_jwt_claims().is_some(),
            Phase::SignInExperience => desired.sign_in_experience.is_some(),
            Phase::SmtpConnector => desired.smtp_connector().is_some(),
        }
    }

    /// What a dry run reports this phase would reconcile.
    pub fn intention(self, desired: &DesiredState) -> String {
        match self {
            Phase::Resources => format!("would sync {} resources", desired.resources.len()),
            Phase::OrganizationScopes => format!(
                "would sync {} organization scopes",
                desired.all_permissions().len()
            ),
            Phase::OrganizationRoles => format!(
                "would sync {} organization roles",
                desired.organization_type_roles().len()
            ),
            Phase::OrganizationRoleScopes => format!(
                "would sync scopes of {} organization roles",
                desired.organization_type_roles().len()
            ),
            Phase::UserRoles => {
                format!("would sync {} user roles", desired.user_type_roles().len())
            }
            Phase::UserRolePermissions => format!(
                "would sync permissions of {} user roles",
                desired.user_type_roles().len()
            ),
            Phase::Applications => format!(
                "would sync {} third-party applications",
                desired.third_party_apps.len()
            ),
            Phase::Customizations => "would sync the custom JWT claims script".to_string(),
            Phase::SignInExperience => "would sync the sign-in experience".to_string(),
            Phase::SmtpConnector => match desired.smtp_connector() {
                Some(smtp) => format!("would sync the SMTP connector for {}", smtp.host),
                None => "would sync the SMTP connector".to_string(),
            },
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
