//! Desired-state model for rbac-sync.
//!
//! The desired state is the operator-authored YAML description of the
//! resources, roles, permissions, and third-party applications a directory
//! tenant should contain. This crate parses it, validates it, and exposes
//! the read-only views the reconciliation engine works from.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{Error, Result};
pub use loader::{MAX_CONFIG_SIZE, load_from_file, parse};
pub use schema::{
    AccessControl, Application, Connectors, CustomJwtClaims, Customizations,
    DEFAULT_APPLICATION_SCOPES, DesiredState, Metadata, Permission, Resource, Role, RoleType,
    SignInBranding, SignInColors, SignInExperience, SignInLanguage, SignInMethod, SignInMethods,
    SignUpSettings, SmtpConnector, TemplateSettings,
};
pub use validation::{
    SYSTEM_PERMISSION_PREFIXES, ValidationError, is_system_permission, reference_errors, validate,
    validate_structure,
};
