//! Error types for rbac-cli

use rbac_directory::DirectoryError;
use rbac_model::ValidationError;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

/// Errors that end a CLI invocation with exit code 1
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Loading the desired-state file failed
    #[error(transparent)]
    Model(#[from] rbac_model::Error),

    /// The desired-state file breaks a validation rule
    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The directory client could not be built
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The directory did not answer the pre-flight check
    #[error("Failed to connect to the directory: {0}")]
    Connection(#[source] DirectoryError),

    /// Standard I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to render YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The run completed but at least one phase failed
    #[error("Synchronization finished with {errors} failed phase(s)")]
    SyncFailed { errors: usize },

    /// User-facing error with a message
    #[error("{message}")]
    User { message: String },
}

impl CliError {
    /// Create a new user error with the given message
    pub fn user(message: impl Into<String>) -> Self {
        Self::User {
            message: message.into(),
        }
    }
}
