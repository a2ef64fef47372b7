//! Identity directory client for rbac-sync.
//!
//! [`DirectoryClient`] is the only way the reconciliation engine touches the
//! directory. [`HttpDirectoryClient`] implements it against the management
//! API with cached client-credentials tokens, transparent paging, and
//! bounded retries of transient failures.

pub mod client;
pub mod error;
pub mod http;
pub mod token;
pub mod types;

pub use client::DirectoryClient;
pub use error::{DirectoryError, Result};
pub use http::{DirectoryConfig, HttpDirectoryClient};
pub use reqwest::StatusCode;
pub use token::TokenCache;
pub use types::{
    ApplicationDraft, OidcClientMetadata, RemoteApplication, RemoteConnector, RemoteResource,
    RemoteRole, RemoteScope, ResourceDraft, RoleDraft, RoleKind, ScopeDraft,
};
