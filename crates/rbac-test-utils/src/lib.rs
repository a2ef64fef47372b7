//! Shared test utilities for the rbac-sync workspace.
//!
//! Dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`directory`]: [`InMemoryDirectory`], a scriptable directory client
//! - [`fixtures`]: desired-state builders and on-disk config fixtures

pub mod directory;
pub mod fixtures;

pub use directory::{InMemoryDirectory, SIGN_IN_EXPERIENCE};
pub use fixtures::{ConfigDir, DesiredStateBuilder, SAMPLE_CONFIG};
