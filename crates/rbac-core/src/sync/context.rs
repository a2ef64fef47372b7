//! Shared state for a running phase and the write-recording policy

use chrono::Utc;
use rbac_directory::{DirectoryClient, DirectoryError};

use crate::error::{Error, Result};

use super::options::SyncOptions;
use super::protection::Protections;
use super::report::{EntityKind, OperationAction, SyncOperation, SyncResult};

/// How a failed write affects the rest of its phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureMode {
    /// Stop the phase and report its error.
    Abort,
    /// Log a warning and keep going. The phase still succeeds.
    Advisory,
}

/// A write about to be attempted.
#[derive(Debug, Clone)]
pub struct PendingOp {
    pub entity: EntityKind,
    pub action: OperationAction,
    pub target: String,
    pub description: String,
    /// Summary increment on success.
    pub count: usize,
}

impl PendingOp {
    pub fn new(
        entity: EntityKind,
        action: OperationAction,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            entity,
            action,
            target: target.into(),
            description: description.into(),
            count: 1,
        }
    }

    pub fn counting(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    /// Record the operation without touching the summary.
    pub fn uncounted(self) -> Self {
        self.counting(0)
    }
}

pub(crate) struct PhaseContext<'a> {
    pub client: &'a dyn DirectoryClient,
    pub options: &'a SyncOptions,
    pub protections: &'a Protections,
    pub result: &'a mut SyncResult,
}

impl PhaseContext<'_> {
    /// Record the outcome of one write.
    ///
    /// Success yields `Some(value)`. An advisory failure is logged and
    /// yields `None`; an aborting failure becomes the phase error.
    pub fn record<T>(
        &mut self,
        op: PendingOp,
        mode: FailureMode,
        outcome: std::result::Result<T, DirectoryError>,
    ) -> Result<Option<T>> {
        match outcome {
            Ok(value) => {
                tracing::info!(
                    entity = %op.entity,
                    action = %op.action,
                    target = %op.target,
                    "{}",
                    op.description
                );
                self.result.summary.tally(op.entity, op.action, op.count);
                self.push(op, None);
                Ok(Some(value))
            }
            Err(source) => {
                self.push(op.clone(), Some(source.to_string()));
                match mode {
                    FailureMode::Abort => Err(Error::Write {
                        entity: op.entity,
                        action: op.action,
                        target: op.target,
                        source,
                    }),
                    FailureMode::Advisory => {
                        tracing::warn!(
                            entity = %op.entity,
                            action = %op.action,
                            target = %op.target,
                            error = %source,
                            "Failed to {} {} {}",
                            op.action,
                            op.entity,
                            op.target
                        );
                        Ok(None)
                    }
                }
            }
        }
    }

    fn push(&mut self, op: PendingOp, error: Option<String>) {
        self.result.operations.push(SyncOperation {
            entity: op.entity,
            action: op.action,
            resource: op.target,
            description: op.description,
            success: error.is_none(),
            error,
            timestamp: Utc::now(),
        });
    }
}
