//! Desired-state reconciliation
//!
//! [`SyncEngine`] walks the phases in [`PHASES`] order. Each phase fetches
//! the remote state it needs, diffs it by name against the desired state,
//! and issues the writes that close the gap. Every write lands in the
//! [`SyncResult`] as one [`SyncOperation`].

mod applications;
mod connectors;
mod context;
mod customizations;
mod engine;
mod mapping;
mod options;
mod organization_scopes;
mod phase;
mod protection;
mod report;
mod resources;
mod roles;
mod sign_in_experience;

pub use applications::application_custom_data;
pub use connectors::{render_template, smtp_connector_config};
pub use context::{FailureMode, PendingOp};
pub use customizations::normalize_script;
pub use engine::SyncEngine;
pub use mapping::{BindingDiff, ScopeCatalog, diff_bindings, roles_by_name};
pub use options::SyncOptions;
pub use organization_scopes::organization_scope_description;
pub use phase::{PHASES, Phase, PhaseDescriptor};
pub use protection::{ProtectionPolicy, Protections, ReservedPatterns};
pub use report::{EntityKind, OperationAction, Summary, SyncOperation, SyncResult};
pub use roles::RoleFlavor;
pub use sign_in_experience::{data_url, image_mime_type, sign_in_experience_patch};
