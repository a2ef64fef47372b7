//! SyncEngine implementation
//!
//! The engine runs every enabled phase in [`PHASES`] order against one
//! directory client. A failing phase is recorded in
//! [`SyncResult::errors`] and the run moves on to the next phase; the
//! engine itself never fails.

use std::sync::Arc;

use rbac_directory::DirectoryClient;
use rbac_model::DesiredState;

use crate::Result;

use super::applications::sync_applications;
use super::connectors::sync_smtp_connector;
use super::context::PhaseContext;
use super::customizations::sync_customizations;
use super::options::SyncOptions;
use super::organization_scopes::sync_organization_scopes;
use super::phase::{PHASES, Phase};
use super::protection::Protections;
use super::report::SyncResult;
use super::resources::sync_resources;
use super::roles::{RoleFlavor, sync_role_bindings, sync_roles};
use super::sign_in_experience::sync_sign_in_experience;

/// Reconciles a desired state against an identity directory.
pub struct SyncEngine {
    client: Arc<dyn DirectoryClient>,
    options: SyncOptions,
    protections: Protections,
}

impl SyncEngine {
    /// Create an engine with the default protection policies.
    pub fn new(client: Arc<dyn DirectoryClient>, options: SyncOptions) -> Self {
        Self {
            client,
            options,
            protections: Protections::default(),
        }
    }

    /// Replace the protection policies consulted during cleanup.
    pub fn with_protections(mut self, protections: Protections) -> Self {
        self.protections = protections;
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    /// Phases that would run for `desired`, in order.
    pub fn plan(&self, desired: &DesiredState) -> Vec<Phase> {
        PHASES
            .iter()
            .map(|d| d.phase)
            .filter(|p| p.is_enabled(&self.options, desired))
            .collect()
    }

    /// Run one reconciliation.
    ///
    /// In dry-run mode each enabled phase only logs its intention; no
    /// directory call is made and no operation is recorded.
    pub async fn sync(&self, desired: &DesiredState) -> SyncResult {
        let mut result = SyncResult::begin(self.options.dry_run);
        tracing::info!(
            dry_run = self.options.dry_run,
            cleanup = self.options.cleanup,
            "Starting reconciliation"
        );

        for descriptor in PHASES {
            let phase = descriptor.phase;
            if !phase.is_enabled(&self.options, desired) {
                tracing::debug!(phase = %phase, "Phase skipped");
                continue;
            }
            if self.options.dry_run {
                tracing::info!(phase = %phase, "[dry-run] {}", phase.intention(desired));
                continue;
            }

            tracing::info!(phase = %phase, "Syncing {}", descriptor.label.to_lowercase());
            let mut ctx = PhaseContext {
                client: self.client.as_ref(),
                options: &self.options,
                protections: &self.protections,
                result: &mut result,
            };
            if let Err(e) = run_phase(phase, &mut ctx, desired).await {
                tracing::error!(phase = %phase, error = %e, "Phase failed");
                result
                    .errors
                    .push(format!("{} sync failed: {}", descriptor.label, e));
            }
        }

        result.finish();
        tracing::info!(
            success = result.success,
            changes = result.summary.total_changes(),
            errors = result.errors.len(),
            duration = ?result.duration,
            "Reconciliation finished"
        );
        result
    }
}

async fn run_phase(phase: Phase, ctx: &mut PhaseContext<'_>, desired: &DesiredState) -> Result<()> {
    match phase {
        Phase::Resources => sync_resources(ctx, desired).await,
        Phase::OrganizationScopes => sync_organization_scopes(ctx, desired).await,
        Phase::OrganizationRoles => sync_roles(ctx, desired, RoleFlavor::Organization).await,
        Phase::OrganizationRoleScopes => {
            sync_role_bindings(ctx, desired, RoleFlavor::Organization).await
        }
        Phase::UserRoles => sync_roles(ctx, desired, RoleFlavor::User).await,
        Phase::UserRolePermissions => sync_role_bindings(ctx, desired, RoleFlavor::User).await,
        Phase::Applications => sync_applications(ctx, desired).await,
        Phase::Customizations => sync_customizations(ctx, desired).await,
        Phase::SignInExperience => sync_sign_in_experience(ctx, desired).await,
        Phase::SmtpConnector => sync_smtp_connector(ctx, desired).await,
    }
}
