//! SMTP connector phase
//!
//! The tenant keeps at most one SMTP connector instance. It is created when
//! missing and updated when its stored configuration no longer contains the
//! desired one.

use serde_json::{Map, Value, json};

use rbac_directory::RemoteConnector;
use rbac_model::{DesiredState, SmtpConnector, TemplateSettings};

use crate::error::{Error, Result};

use super::context::{FailureMode, PendingOp, PhaseContext};
use super::mapping::json_contains;
use super::options::SyncOptions;
use super::report::{EntityKind, OperationAction};

const TARGET: &str = "smtp";

const VERIFICATION_CODE_BODY: &str =
    "Your verification code is {{code}}. The code will remain active for 10 minutes.";

/// `(usage type, subject)` of every mail the connector sends.
const MAIL_TEMPLATES: &[(&str, &str)] = &[
    ("SignIn", "Sign In Verification Code"),
    ("Register", "Registration Verification Code"),
    ("ForgotPassword", "Password Reset Verification Code"),
    ("Generic", "Verification Code"),
];

/// Fill the `{{.SupportEmail}}` and `{{.CompanyName}}` placeholders the
/// settings provide values for.
pub fn render_template(template: &str, settings: Option<&TemplateSettings>) -> String {
    let Some(settings) = settings else {
        return template.to_string();
    };
    let mut rendered = template.to_string();
    for (placeholder, value) in [
        ("{{.SupportEmail}}", &settings.support_email),
        ("{{.CompanyName}}", &settings.company_name),
    ] {
        if let Some(value) = value {
            rendered = rendered.replace(placeholder, value);
        }
    }
    rendered
}

async fn mail_templates(options: &SyncOptions, smtp: &SmtpConnector) -> Result<Vec<Value>> {
    let forgot_password = match smtp
        .forgot_password_template
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        Some(path) => {
            let path = options.resolve_path(path);
            let html = tokio::fs::read_to_string(&path)
                .await
                .map_err(|source| Error::Asset {
                    path: path.clone(),
                    source,
                })?;
            Some(render_template(&html, smtp.template_settings.as_ref()))
        }
        None => None,
    };

    Ok(MAIL_TEMPLATES
        .iter()
        .map(|&(usage, subject)| match (usage, &forgot_password) {
            ("ForgotPassword", Some(html)) => json!({
                "usageType": usage,
                "subject": subject,
                "content": html,
                "contentType": "text/html",
            }),
            _ => json!({
                "usageType": usage,
                "subject": subject,
                "content": VERIFICATION_CODE_BODY,
                "contentType": "text/plain",
            }),
        })
        .collect())
}

/// The connector configuration the directory must hold.
pub async fn smtp_connector_config(options: &SyncOptions, smtp: &SmtpConnector) -> Result<Value> {
    let templates = mail_templates(options, smtp).await?;
    let headers: Map<String, Value> = smtp
        .custom_headers
        .iter()
        .map(|(name, value)| (name.clone(), Value::String(value.clone())))
        .collect();

    Ok(json!({
        "host": smtp.host,
        "port": smtp.port(),
        "auth": {
            "type": "login",
            "user": smtp.username,
            "pass": smtp.password,
        },
        "fromEmail": smtp.formatted_sender(),
        "fromName": smtp.from_name.clone().unwrap_or_default(),
        "templates": templates,
        "logger": smtp.logger.unwrap_or(true),
        "debug": smtp.debug,
        "disableFileAccess": smtp.disable_file_access.unwrap_or(true),
        "disableUrlAccess": smtp.disable_url_access.unwrap_or(true),
        "secure": smtp.secure,
        "tls": {},
        "requireTLS": smtp.tls,
        "customHeaders": headers,
    }))
}

pub(crate) async fn sync_smtp_connector(
    ctx: &mut PhaseContext<'_>,
    desired: &DesiredState,
) -> Result<()> {
    let Some(smtp) = desired.smtp_connector() else {
        return Ok(());
    };
    let client = ctx.client;

    let config = smtp_connector_config(ctx.options, smtp).await?;
    let connectors = client
        .list_connectors()
        .await
        .map_err(Error::fetch("connectors"))?;

    match connectors
        .iter()
        .find(|c| c.connector_id == RemoteConnector::SMTP)
    {
        Some(existing) if json_contains(&existing.config, &config) => {
            tracing::debug!(id = %existing.id, "SMTP connector up to date");
        }
        Some(existing) => {
            let op = PendingOp::new(
                EntityKind::Connector,
                OperationAction::Update,
                TARGET,
                format!("Updated SMTP connector for {}", smtp.host),
            );
            let outcome = client.update_connector(&existing.id, &config).await;
            ctx.record(op, FailureMode::Abort, outcome)?;
        }
        None => {
            let op = PendingOp::new(
                EntityKind::Connector,
                OperationAction::Create,
                TARGET,
                format!("Created SMTP connector for {}", smtp.host),
            );
            let outcome = client
                .create_connector(RemoteConnector::SMTP, &config)
                .await;
            ctx.record(op, FailureMode::Abort, outcome)?;
        }
    }
    Ok(())
}
