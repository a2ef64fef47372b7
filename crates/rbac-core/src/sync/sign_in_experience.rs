//! Sign-in experience phase
//!
//! The desired settings become one patch: colors, branding images inlined
//! as data URLs, the custom stylesheet, language, and sign-in and sign-up
//! methods. The directory is patched only when its current settings do not
//! already contain that patch. Unreadable branding images and stylesheets
//! are skipped with a warning.

use std::path::Path;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Map, Value, json};

use rbac_model::{DesiredState, SignInBranding, SignInExperience};

use crate::error::{Error, Result};

use super::context::{FailureMode, PendingOp, PhaseContext};
use super::mapping::json_contains;
use super::options::SyncOptions;
use super::report::{EntityKind, OperationAction};

const TARGET: &str = "sign-in-experience";

/// MIME type of an image, by file extension.
pub fn image_mime_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// `data:<mime>;base64,<payload>` for the file at `path` holding `bytes`.
pub fn data_url(path: &Path, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", image_mime_type(path), STANDARD.encode(bytes))
}

async fn load_image(options: &SyncOptions, path: &str) -> Option<String> {
    let path = options.resolve_path(path);
    match tokio::fs::read(&path).await {
        Ok(bytes) => {
            tracing::debug!(path = %path.display(), bytes = bytes.len(), "Loaded branding asset");
            Some(data_url(&path, &bytes))
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable branding asset");
            None
        }
    }
}

async fn branding_patch(options: &SyncOptions, branding: &SignInBranding) -> Option<Value> {
    let mut fields = Map::new();
    for (key, path) in [
        ("logoUrl", &branding.logo_path),
        ("darkLogoUrl", &branding.logo_dark_path),
        ("favicon", &branding.favicon_path),
        ("darkFavicon", &branding.favicon_dark_path),
    ] {
        let Some(path) = path.as_deref().filter(|p| !p.trim().is_empty()) else {
            continue;
        };
        if let Some(url) = load_image(options, path).await {
            fields.insert(key.to_string(), Value::String(url));
        }
    }
    (!fields.is_empty()).then_some(Value::Object(fields))
}

/// The patch the directory's sign-in settings must contain.
pub async fn sign_in_experience_patch(options: &SyncOptions, settings: &SignInExperience) -> Value {
    let mut patch = Map::new();

    if let Some(colors) = &settings.colors {
        patch.insert(
            "color".to_string(),
            json!({
                "primaryColor": colors.primary_color,
                "isDarkModeEnabled": colors.dark_mode_enabled,
                "darkPrimaryColor": colors.primary_color_dark,
            }),
        );
    }

    if let Some(branding) = &settings.branding
        && let Some(branding) = branding_patch(options, branding).await
    {
        patch.insert("branding".to_string(), branding);
    }

    if let Some(css_path) = settings
        .custom_css_path
        .as_deref()
        .filter(|p| !p.trim().is_empty())
    {
        let path = options.resolve_path(css_path);
        match tokio::fs::read_to_string(&path).await {
            Ok(css) => {
                patch.insert("customCss".to_string(), Value::String(css));
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable stylesheet");
            }
        }
    }

    if let Some(language) = &settings.language {
        patch.insert(
            "languageInfo".to_string(),
            json!({
                "autoDetect": language.auto_detect,
                "fallbackLanguage": language.fallback_language,
            }),
        );
    }

    if let Some(sign_in) = settings.sign_in.as_ref().filter(|s| !s.methods.is_empty()) {
        let methods: Vec<Value> = sign_in
            .methods
            .iter()
            .map(|m| {
                json!({
                    "identifier": m.identifier,
                    "password": m.password,
                    "verificationCode": m.verification_code,
                    "isPasswordPrimary": m.is_password_primary,
                })
            })
            .collect();
        patch.insert("signIn".to_string(), json!({ "methods": methods }));
    }

    if let Some(sign_up) = &settings.sign_up {
        patch.insert(
            "signUp".to_string(),
            json!({
                "identifiers": sign_up.identifiers,
                "password": sign_up.password,
                "verify": sign_up.verify,
                "secondaryIdentifiers": sign_up.secondary_identifiers,
            }),
        );
    }

    if let Some(social) = &settings.social_sign_in {
        match serde_json::to_value(social) {
            Ok(social) => {
                patch.insert("socialSignIn".to_string(), social);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Skipping social_sign_in that has no JSON form");
            }
        }
    }

    Value::Object(patch)
}

pub(crate) async fn sync_sign_in_experience(
    ctx: &mut PhaseContext<'_>,
    desired: &DesiredState,
) -> Result<()> {
    let Some(settings) = &desired.sign_in_experience else {
        return Ok(());
    };
    let client = ctx.client;

    let patch = sign_in_experience_patch(ctx.options, settings).await;
    let Value::Object(fields) = &patch else {
        return Ok(());
    };
    if fields.is_empty() {
        tracing::debug!("Sign-in experience declares nothing to apply");
        return Ok(());
    }

    let current = client
        .get_sign_in_experience()
        .await
        .map_err(Error::fetch("sign-in experience"))?;
    if json_contains(&current, &patch) {
        tracing::debug!("Sign-in experience up to date");
        return Ok(());
    }

    let mut drifted: Vec<&str> = fields
        .iter()
        .filter(|(key, value)| {
            !current
                .get(key.as_str())
                .is_some_and(|present| json_contains(present, value))
        })
        .map(|(key, _)| key.as_str())
        .collect();
    drifted.sort_unstable();

    let op = PendingOp::new(
        EntityKind::SignInExperience,
        OperationAction::Update,
        TARGET,
        format!("Updated sign-in experience ({})", drifted.join(", ")),
    );
    let outcome = client.update_sign_in_experience(&patch).await;
    ctx.record(op, FailureMode::Abort, outcome)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbac_model::{SignInColors, SignInMethod, SignInMethods};
    use std::path::PathBuf;

    #[test]
    fn test_image_mime_type_by_extension() {
        assert_eq!(image_mime_type(Path::new("logo.PNG")), "image/png");
        assert_eq!(image_mime_type(Path::new("a/b/logo.svg")), "image/svg+xml");
        assert_eq!(image_mime_type(Path::new("favicon.ico")), "image/x-icon");
        assert_eq!(image_mime_type(Path::new("blob")), "application/octet-stream");
    }

    #[test]
    fn test_data_url() {
        assert_eq!(
            data_url(Path::new("dot.gif"), b"GIF89a"),
            "data:image/gif;base64,R0lGODlh"
        );
    }

    #[tokio::test]
    async fn test_patch_skips_missing_assets() {
        let options = SyncOptions {
            config_dir: PathBuf::from("/nonexistent/rbac"),
            ..Default::default()
        };
        let settings = SignInExperience {
            colors: Some(SignInColors {
                primary_color: "#0069A8".to_string(),
                ..Default::default()
            }),
            branding: Some(SignInBranding {
                logo_path: Some("logo.png".to_string()),
                ..Default::default()
            }),
            custom_css_path: Some("login.css".to_string()),
            sign_in: Some(SignInMethods {
                methods: vec![SignInMethod {
                    identifier: "email".to_string(),
                    password: true,
                    ..Default::default()
                }],
            }),
            ..Default::default()
        };

        let patch = sign_in_experience_patch(&options, &settings).await;

        let keys: Vec<&str> = patch.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["color", "signIn"]);
        assert_eq!(patch["color"]["primaryColor"], "#0069A8");
        assert_eq!(patch["signIn"]["methods"][0]["identifier"], "email");
    }
}
