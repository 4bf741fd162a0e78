//! Destructive reset and full-state restore
//!
//! Both operations quiesce the store first: the reset guard goes up, the
//! shared handle closes, and only then do the store files get touched.
//! Restore validates the snapshot before any destructive step so a
//! corrupt file can never cost the user their data.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use gradekeeper_core::artifact::{self, SnapshotError};
use gradekeeper_core::collections::Collection;
use gradekeeper_core::storage::{self, ResetError, ResetOutcome, StoreError};

use crate::guards::ResetGuard;
use crate::handle::SharedStore;

/// Phases of the reset/restore state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResetPhase {
    Idle,
    Resetting,
    Deleted,
    Cleared,
    Importing,
    Failed,
}

/// Errors from the reset orchestration
#[derive(Error, Debug)]
pub enum ResetFailure {
    #[error("another reset is already running")]
    Busy,

    #[error(transparent)]
    Fatal(#[from] ResetError),
}

/// Errors from a restore
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Reset(#[from] ResetFailure),

    #[error("import failed: {0}")]
    Store(#[from] StoreError),
}

/// Coordinator for hard reset and restore
pub struct ResetCoordinator {
    store: Arc<SharedStore>,
    reset: Arc<ResetGuard>,
    phase: watch::Sender<ResetPhase>,
}

impl ResetCoordinator {
    pub fn new(store: Arc<SharedStore>, reset: Arc<ResetGuard>) -> Self {
        let (phase, _) = watch::channel(ResetPhase::Idle);
        Self {
            store,
            reset,
            phase,
        }
    }

    /// Subscribe to the reset phase
    #[must_use]
    pub fn phase(&self) -> watch::Receiver<ResetPhase> {
        self.phase.subscribe()
    }

    /// Empty every declared collection
    ///
    /// Deletes the physical store when possible, clears every collection
    /// in place when deletion is blocked. The reset guard is up for the
    /// whole protocol so saves and backups skip their cycle.
    ///
    /// # Errors
    /// Returns [`ResetFailure::Busy`] if a reset is already running, or
    /// the fatal error when both reset paths fail
    pub async fn hard_reset(&self) -> Result<ResetOutcome, ResetFailure> {
        let Some(_token) = self.reset.begin() else {
            return Err(ResetFailure::Busy);
        };
        let outcome = self.reset_locked().await?;
        self.phase.send_replace(ResetPhase::Idle);
        Ok(outcome)
    }

    /// Full-state overwrite from an external snapshot
    ///
    /// Validation precedes the reset: an unrecognizable snapshot fails
    /// here with the store untouched. After a successful reset a fresh
    /// handle is opened and the snapshot imported wholesale; the caller
    /// is expected to restart the consuming application, since all of
    /// its in-memory state was derived from the pre-reset store.
    ///
    /// # Errors
    /// Returns an error for an invalid snapshot, a fatal reset, or a
    /// failed import
    pub async fn restore(&self, snapshot: &Value) -> Result<ResetOutcome, RestoreError> {
        let parsed = artifact::parse_snapshot(snapshot)?;

        let Some(_token) = self.reset.begin() else {
            return Err(ResetFailure::Busy.into());
        };
        let outcome = self.reset_locked().await?;

        self.phase.send_replace(ResetPhase::Importing);
        if let Err(err) = self.import_snapshot(&parsed).await {
            warn!(error = %err, "restore import failed after reset");
            self.phase.send_replace(ResetPhase::Failed);
            return Err(err.into());
        }

        info!(collections = parsed.len(), "restore imported snapshot");
        self.phase.send_replace(ResetPhase::Idle);
        Ok(outcome)
    }

    /// Open a fresh handle and import the parsed snapshot wholesale.
    async fn import_snapshot(
        &self,
        parsed: &BTreeMap<Collection, Value>,
    ) -> Result<(), StoreError> {
        self.store.open().await?;
        self.store.import_all(parsed).await
    }

    /// The protocol body; caller holds the reset token.
    async fn reset_locked(&self) -> Result<ResetOutcome, ResetFailure> {
        self.phase.send_replace(ResetPhase::Resetting);
        self.store.close().await;

        match storage::hard_reset(self.store.path()) {
            Ok(outcome) => {
                info!(?outcome, "hard reset completed");
                self.phase.send_replace(match outcome {
                    ResetOutcome::Deleted => ResetPhase::Deleted,
                    ResetOutcome::Cleared => ResetPhase::Cleared,
                });
                Ok(outcome)
            }
            Err(err) => {
                warn!(error = %err, "hard reset failed on both paths");
                self.phase.send_replace(ResetPhase::Failed);
                Err(err.into())
            }
        }
    }
}
