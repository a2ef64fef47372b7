//! Third-party applications phase
//!
//! Applications are matched by exact name (their FQDN). An existing
//! application is patched only in the parts that drifted: its registration
//! (description, redirect URIs, custom data), its branding display name,
//! and its consent scopes. Each changed application counts once in the
//! summary however many parts were patched.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value, json};

use rbac_directory::{ApplicationDraft, OidcClientMetadata, RemoteApplication};
use rbac_model::{Application, DesiredState};

use crate::error::{Error, Result};

use super::context::{FailureMode, PendingOp, PhaseContext};
use super::report::{EntityKind, OperationAction};

/// Custom data carried by an application: its access control and login URL.
pub fn application_custom_data(app: &Application) -> Value {
    let mut data = Map::new();
    if let Some(access) = &app.access_control {
        data.insert(
            "access_control".to_string(),
            json!({
                "organization_roles": access.organization_roles,
                "user_roles": access.user_roles,
            }),
        );
    }
    if let Some(login_url) = app.login_url.as_deref().filter(|u| !u.is_empty()) {
        data.insert("login_url".to_string(), json!(login_url));
    }
    Value::Object(data)
}

fn desired_metadata(app: &Application) -> OidcClientMetadata {
    OidcClientMetadata {
        redirect_uris: app.redirect_uris.clone(),
        post_logout_redirect_uris: app.post_logout_redirect_uris.clone(),
    }
}

fn has_uris(app: &Application) -> bool {
    !app.redirect_uris.is_empty() || !app.post_logout_redirect_uris.is_empty()
}

/// Whether the registration itself needs patching.
fn registration_drifted(remote: &RemoteApplication, app: &Application) -> bool {
    let remote_data = match &remote.custom_data {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    let remote_metadata = remote.oidc_client_metadata.clone().unwrap_or_default();

    remote.description() != app.description
        || remote_data != application_custom_data(app)
        || remote_metadata != desired_metadata(app)
}

pub(crate) async fn sync_applications(
    ctx: &mut PhaseContext<'_>,
    desired: &DesiredState,
) -> Result<()> {
    let client = ctx.client;
    let remote = client
        .list_third_party_applications()
        .await
        .map_err(Error::fetch("third-party applications"))?;
    let by_name: HashMap<&str, &RemoteApplication> =
        remote.iter().map(|a| (a.name.as_str(), a)).collect();

    for app in &desired.third_party_apps {
        match by_name.get(app.name.as_str()) {
            Some(existing) => update_application(ctx, existing, app).await?,
            None => create_application(ctx, app).await?,
        }
    }

    if ctx.options.cleanup {
        let declared: HashSet<&str> = desired
            .third_party_apps
            .iter()
            .map(|a| a.name.as_str())
            .collect();
        for existing in &remote {
            if declared.contains(existing.name.as_str()) {
                continue;
            }
            if ctx
                .protections
                .applications
                .is_reserved(&existing.name, existing.description())
            {
                tracing::debug!(application = %existing.name, "Keeping reserved application");
                continue;
            }
            let op = PendingOp::new(
                EntityKind::Application,
                OperationAction::Delete,
                &existing.name,
                format!("Deleted application {}", existing.name),
            );
            let outcome = client.delete_third_party_application(&existing.id).await;
            ctx.record(op, FailureMode::Advisory, outcome)?;
        }
    }
    Ok(())
}

async fn create_application(ctx: &mut PhaseContext<'_>, app: &Application) -> Result<()> {
    let client = ctx.client;
    let draft = ApplicationDraft {
        name: app.name.clone(),
        description: app.description.clone(),
        app_type: Some(ApplicationDraft::TRADITIONAL.to_string()),
        is_third_party: true,
        oidc_client_metadata: has_uris(app).then(|| desired_metadata(app)),
        custom_data: application_custom_data(app),
    };
    let op = PendingOp::new(
        EntityKind::Application,
        OperationAction::Create,
        &app.name,
        format!("Created application {}", app.name),
    );
    let outcome = client.create_third_party_application(&draft).await;
    let Some(created) = ctx.record(op, FailureMode::Abort, outcome)? else {
        return Ok(());
    };

    let op = PendingOp::new(
        EntityKind::Application,
        OperationAction::Update,
        &app.name,
        format!("Set branding of {} to {}", app.name, app.display_name),
    )
    .uncounted();
    let outcome = client
        .set_application_display_name(&created.id, &app.display_name)
        .await;
    ctx.record(op, FailureMode::Abort, outcome)?;

    let scopes = app.effective_scopes();
    let op = PendingOp::new(
        EntityKind::Application,
        OperationAction::Update,
        &app.name,
        format!("Set {} consent scopes of {}", scopes.len(), app.name),
    )
    .uncounted();
    let outcome = client
        .set_application_consent_scopes(&created.id, &scopes)
        .await;
    ctx.record(op, FailureMode::Abort, outcome)?;
    Ok(())
}

async fn update_application(
    ctx: &mut PhaseContext<'_>,
    existing: &RemoteApplication,
    app: &Application,
) -> Result<()> {
    let client = ctx.client;
    let mut changed = false;

    if registration_drifted(existing, app) {
        let draft = ApplicationDraft {
            name: app.name.clone(),
            description: app.description.clone(),
            app_type: None,
            is_third_party: true,
            oidc_client_metadata: Some(desired_metadata(app)),
            custom_data: application_custom_data(app),
        };
        let op = PendingOp::new(
            EntityKind::Application,
            OperationAction::Update,
            &app.name,
            format!("Updated application {}", app.name),
        )
        .uncounted();
        let outcome = client
            .update_third_party_application(&existing.id, &draft)
            .await;
        ctx.record(op, FailureMode::Abort, outcome)?;
        changed = true;
    }

    let display_name = client
        .get_application_display_name(&existing.id)
        .await
        .map_err(Error::fetch(format!("branding of application {}", app.name)))?;
    if display_name.as_deref() != Some(app.display_name.as_str()) {
        let op = PendingOp::new(
            EntityKind::Application,
            OperationAction::Update,
            &app.name,
            format!("Set branding of {} to {}", app.name, app.display_name),
        )
        .uncounted();
        let outcome = client
            .set_application_display_name(&existing.id, &app.display_name)
            .await;
        ctx.record(op, FailureMode::Abort, outcome)?;
        changed = true;
    }

    let scopes = app.effective_scopes();
    let current: HashSet<String> = client
        .get_application_consent_scopes(&existing.id)
        .await
        .map_err(Error::fetch(format!("consent scopes of application {}", app.name)))?
        .into_iter()
        .collect();
    if current != scopes.iter().cloned().collect::<HashSet<_>>() {
        let op = PendingOp::new(
            EntityKind::Application,
            OperationAction::Update,
            &app.name,
            format!("Set {} consent scopes of {}", scopes.len(), app.name),
        )
        .uncounted();
        let outcome = client
            .set_application_consent_scopes(&existing.id, &scopes)
            .await;
        ctx.record(op, FailureMode::Abort, outcome)?;
        changed = true;
    }

    if changed {
        ctx.result.summary.applications_updated += 1;
    } else {
        tracing::debug!(application = %app.name, "Application up to date");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rbac_model::AccessControl;

    fn app() -> Application {
        Application {
            name: "portal.example.com".to_string(),
            description: "Customer portal".to_string(),
            display_name: "Portal".to_string(),
            login_url: Some("https://portal.example.com/login".to_string()),
            redirect_uris: vec!["https://portal.example.com/callback".to_string()],
            access_control: Some(AccessControl {
                organization_roles: vec!["owner".to_string()],
                user_roles: vec![],
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_custom_data_shape() {
        assert_eq!(
            application_custom_data(&app()),
            json!({
                "access_control": { "organization_roles": ["owner"], "user_roles": [] },
                "login_url": "https://portal.example.com/login"
            })
        );
        assert_eq!(application_custom_data(&Application::default()), json!({}));
    }

    #[test]
    fn test_registration_drift() {
        let desired = app();
        let mut remote = RemoteApplication {
            id: "a1".to_string(),
            name: desired.name.clone(),
            description: Some(desired.description.clone()),
            app_type: Some("Traditional".to_string()),
            is_third_party: true,
            oidc_client_metadata: Some(desired_metadata(&desired)),
            custom_data: application_custom_data(&desired),
        };
        assert!(!registration_drifted(&remote, &desired));

        remote.oidc_client_metadata = None;
        assert!(registration_drifted(&remote, &desired));
    }

    #[test]
    fn test_null_custom_data_matches_empty() {
        let desired = Application {
            name: "bare.example.com".to_string(),
            ..Default::default()
        };
        let remote = RemoteApplication {
            id: "a2".to_string(),
            name: desired.name.clone(),
            description: None,
            app_type: None,
            is_third_party: true,
            oidc_client_metadata: None,
            custom_data: Value::Null,
        };
        assert!(!registration_drifted(&remote, &desired));
    }
}
