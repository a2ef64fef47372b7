//! Error types for rbac-directory

use reqwest::StatusCode;

pub type Result<T> = std::result::Result<T, DirectoryError>;

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Token acquisition failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The request never produced a response.
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The directory answered with a non-success status.
    #[error("{method} {path} returned {status}: {body}")]
    Status {
        method: String,
        path: String,
        status: StatusCode,
        body: String,
    },

    /// The response body did not match the expected shape.
    #[error("Unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    /// The client was configured with unusable settings.
    #[error("Invalid directory configuration: {0}")]
    Config(String),
}

impl DirectoryError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            DirectoryError::Transport { source, .. } => source.is_timeout() || source.is_connect(),
            DirectoryError::Status { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// The HTTP status, when the directory answered.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            DirectoryError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
