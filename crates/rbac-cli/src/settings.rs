//! Connection settings from the environment
//!
//! | Variable                | Required | Default                          |
//! |-------------------------|----------|----------------------------------|
//! | `TENANT_ID`             | yes      |                                  |
//! | `BACKEND_CLIENT_ID`     | yes      |                                  |
//! | `BACKEND_CLIENT_SECRET` | yes      |                                  |
//! | `LOGTO_BASE_URL`        | no       | `https://<TENANT_ID>.logto.app`  |
//! | `API_BASE_URL`          | no       | `https://<TENANT_DOMAIN>/api`, else `http://localhost:8080/api` |

use std::path::Path;

use crate::error::{CliError, Result};

pub const REQUIRED_VARIABLES: &[&str] = &["TENANT_ID", "BACKEND_CLIENT_ID", "BACKEND_CLIENT_SECRET"];

const LOCAL_API_BASE_URL: &str = "http://localhost:8080/api";

/// Everything needed to reach and authenticate against the directory.
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Directory endpoint, e.g. `https://tenant.logto.app`.
    pub directory_url: String,
    /// Base URL resource indicators are built from.
    pub api_base_url: String,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("directory_url", &self.directory_url)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let missing: Vec<&str> = REQUIRED_VARIABLES
            .iter()
            .copied()
            .filter(|key| get(key).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(CliError::user(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let tenant_id = get("TENANT_ID").unwrap_or_default();
        let directory_url = get("LOGTO_BASE_URL")
            .unwrap_or_else(|| format!("https://{}.logto.app", tenant_id));
        let api_base_url = get("API_BASE_URL").unwrap_or_else(|| match get("TENANT_DOMAIN") {
            Some(domain) => format!("https://{}/api", domain),
            None => LOCAL_API_BASE_URL.to_string(),
        });

        Ok(Self {
            tenant_id,
            client_id: get("BACKEND_CLIENT_ID").unwrap_or_default(),
            client_secret: get("BACKEND_CLIENT_SECRET").unwrap_or_default(),
            directory_url,
            api_base_url,
        })
    }
}

/// Load environment variables from `path`, or from `./.env` when no path
/// is given. Only an explicitly named file is required to exist.
/// Variables already set in the process win.
pub fn load_env_file(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path).map_err(|e| {
                CliError::user(format!(
                    "Failed to load environment file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            tracing::debug!(path = %path.display(), "Loaded environment file");
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                tracing::debug!(path = %path.display(), "Loaded environment file");
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[
        ("TENANT_ID", "acme"),
        ("BACKEND_CLIENT_ID", "client"),
        ("BACKEND_CLIENT_SECRET", "secret"),
    ];

    #[test]
    fn test_defaults_derive_from_tenant() {
        let settings = Settings::from_lookup(lookup(REQUIRED)).unwrap();
        assert_eq!(settings.directory_url, "https://acme.logto.app");
        assert_eq!(settings.api_base_url, "http://localhost:8080/api");
    }

    #[test]
    fn test_api_base_url_from_tenant_domain() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("TENANT_DOMAIN", "my.example.com"));
        let settings = Settings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(settings.api_base_url, "https://my.example.com/api");
    }

    #[test]
    fn test_explicit_urls_win() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("TENANT_DOMAIN", "my.example.com"));
        vars.push(("API_BASE_URL", "https://api.example.com/v2"));
        vars.push(("LOGTO_BASE_URL", "http://127.0.0.1:3001"));
        let settings = Settings::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(settings.api_base_url, "https://api.example.com/v2");
        assert_eq!(settings.directory_url, "http://127.0.0.1:3001");
    }

    #[test]
    fn test_missing_variables_are_listed() {
        let err = Settings::from_lookup(lookup(&[("TENANT_ID", "acme"), ("BACKEND_CLIENT_ID", " ")]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: BACKEND_CLIENT_ID, BACKEND_CLIENT_SECRET"
        );
    }

    #[test]
    fn test_debug_redacts_secret() {
        let settings = Settings::from_lookup(lookup(REQUIRED)).unwrap();
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("secret\""));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_named_env_file_must_exist() {
        let err = load_env_file(Some(Path::new("/nonexistent/rbac.env"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/rbac.env"));
    }
}
