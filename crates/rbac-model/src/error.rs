//! Error types for rbac-model

use std::path::PathBuf;

use crate::validation::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration not found at {}", path.display())]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid configuration at {}: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },

    #[error("Config file too large: {} is {size} bytes (max {max})", path.display())]
    ConfigTooLarge { path: PathBuf, size: u64, max: u64 },

    #[error("Invalid role type: {value}")]
    InvalidRoleType { value: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
