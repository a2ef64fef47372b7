//! Error types for rbac-core

use std::path::PathBuf;

use rbac_directory::DirectoryError;

use crate::sync::{EntityKind, OperationAction};

/// Result type for rbac-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end a reconciliation phase early
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Reading remote state failed
    #[error("failed to fetch {what}: {source}")]
    Fetch {
        what: String,
        #[source]
        source: DirectoryError,
    },

    /// A create, update, or assign call failed
    #[error("failed to {action} {entity} {target}: {source}")]
    Write {
        entity: EntityKind,
        action: OperationAction,
        target: String,
        #[source]
        source: DirectoryError,
    },

    /// The token-claims script could not be read
    #[error("failed to read claims script {}: {source}", path.display())]
    Script {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A stylesheet or mail template referenced by the desired state could
    /// not be read
    #[error("failed to read {}: {source}", path.display())]
    Asset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn fetch(what: impl Into<String>) -> impl FnOnce(DirectoryError) -> Self {
        let what = what.into();
        move |source| Error::Fetch { what, source }
    }
}
