//! Reconciliation engine for rbac-sync.
//!
//! Given a validated [`rbac_model::DesiredState`] and a
//! [`rbac_directory::DirectoryClient`], [`SyncEngine`] converges the
//! directory toward the desired state phase by phase and reports every
//! write it attempted.
//!
//! ```ignore
//! let engine = SyncEngine::new(client, SyncOptions { cleanup: true, ..Default::default() });
//! let result = engine.sync(&desired).await;
//! assert!(result.success);
//! ```

pub mod error;
pub mod sync;

pub use error::{Error, Result};
pub use sync::{
    BindingDiff, EntityKind, FailureMode, OperationAction, PHASES, Phase, PhaseDescriptor,
    ProtectionPolicy, Protections, ReservedPatterns, RoleFlavor, ScopeCatalog, Summary,
    SyncEngine, SyncOperation, SyncOptions, SyncResult,
};
