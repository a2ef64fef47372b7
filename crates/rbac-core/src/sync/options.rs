//! Run options for the reconciliation engine

use std::path::{Path, PathBuf};

/// Options for one reconciliation run
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Log what each enabled phase would reconcile and write nothing.
    pub dry_run: bool,
    /// Skip the resources phase.
    pub skip_resources: bool,
    /// Skip role phases and, with them, their binding phases.
    pub skip_roles: bool,
    /// Skip organization scopes and both binding phases.
    pub skip_permissions: bool,
    /// Delete remote entities absent from the desired state.
    pub cleanup: bool,
    /// Base URL that resource indicators are built from.
    pub api_base_url: String,
    /// Directory relative script paths in the desired state resolve against.
    pub config_dir: PathBuf,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            skip_resources: false,
            skip_roles: false,
            skip_permissions: false,
            cleanup: false,
            api_base_url: "http://localhost:8080/api".to_string(),
            config_dir: PathBuf::from("."),
        }
    }
}

impl SyncOptions {
    /// The indicator a resource named `name` must carry.
    pub fn resource_indicator(&self, name: &str) -> String {
        format!("{}/{}", self.api_base_url.trim_end_matches('/'), name)
    }

    /// Resolve a desired-state path against [`SyncOptions::config_dir`].
    pub fn resolve_path(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.config_dir.join(path)
        }
    }
}
