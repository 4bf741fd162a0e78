//! Periodic local-directory snapshotting
//!
//! Writes one rolling snapshot file into a user-granted directory every
//! five minutes. The grant is re-validated before each use; if the OS
//! revoked it, the configuration is discarded and local backups go
//! silent until the user grants a directory again.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use gradekeeper_core::artifact::BackupArtifact;
use gradekeeper_core::storage::StoreError;

use crate::guards::ResetGuard;
use crate::handle::SharedStore;

/// Fixed snapshot filename; each run overwrites the previous file
pub const SNAPSHOT_FILE: &str = "gradekeeper-backup.json";

/// Interval between scheduled snapshot runs
pub const SNAPSHOT_INTERVAL: Duration = Duration::from_secs(5 * 60);

const PROBE_FILE: &str = ".gradekeeper-probe";

/// Errors while configuring or writing a local snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("directory is not writable: {dir}")]
    NotWritable { dir: PathBuf },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What one snapshot cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotOutcome {
    /// Snapshot written and timestamp recorded
    Written,
    /// Reset in progress; no store read, no file write
    SkippedReset,
    /// No directory configured
    NotConfigured,
    /// The directory grant no longer works; configuration was discarded
    Revoked,
    /// Export or write failed; will retry on the next tick
    Failed,
}

/// Periodic writer to the granted backup directory
pub struct LocalSnapshotter {
    store: Arc<SharedStore>,
    reset: Arc<ResetGuard>,
    dir: Mutex<Option<PathBuf>>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl LocalSnapshotter {
    pub fn new(store: Arc<SharedStore>, reset: Arc<ResetGuard>) -> Arc<Self> {
        Arc::new(Self {
            store,
            reset,
            dir: Mutex::new(None),
            timer: Mutex::new(None),
        })
    }

    /// Accept a directory grant and arm the snapshot timer
    ///
    /// The directory is probed for writability before it is accepted.
    /// Reconfiguring cancels the previous timer before arming a new one.
    ///
    /// # Errors
    /// Returns an error if the directory cannot be written to
    pub fn configure(self: &Arc<Self>, dir: PathBuf) -> Result<(), SnapshotError> {
        probe_writable(&dir)?;
        info!(dir = %dir.display(), "local backup directory configured");
        *self.lock_dir() = Some(dir);
        self.rearm();
        Ok(())
    }

    /// Drop the directory grant and cancel the timer
    pub fn disable(&self) {
        *self.lock_dir() = None;
        if let Some(handle) = self.lock_timer().take() {
            handle.abort();
        }
    }

    /// The currently configured directory, if any
    #[must_use]
    pub fn configured_dir(&self) -> Option<PathBuf> {
        self.lock_dir().clone()
    }

    /// One snapshot cycle. Never propagates failure to the caller.
    pub async fn run_once(&self) -> SnapshotOutcome {
        if self.reset.in_progress() {
            debug!("reset in progress, skipping local snapshot");
            return SnapshotOutcome::SkippedReset;
        }

        let Some(dir) = self.configured_dir() else {
            return SnapshotOutcome::NotConfigured;
        };

        if probe_writable(&dir).is_err() {
            warn!(dir = %dir.display(), "backup directory grant lost, disabling local snapshots");
            // The persisted grant goes too; a restart must not re-adopt it.
            let mut state = self.store.load_app_state().await;
            state.local_backup_dir = None;
            self.store.store_app_state(&state).await;
            self.disable();
            return SnapshotOutcome::Revoked;
        }

        match self.write_snapshot(&dir).await {
            Ok(at) => {
                let mut state = self.store.load_app_state().await;
                state.local_backup_dir = Some(dir);
                state.last_local_backup_at = Some(at);
                self.store.store_app_state(&state).await;
                SnapshotOutcome::Written
            }
            Err(err) => {
                warn!(error = %err, "local snapshot failed");
                SnapshotOutcome::Failed
            }
        }
    }

    /// Export the whole store and write it to the fixed filename.
    /// Write-then-rename so a failed run never leaves a torn snapshot.
    async fn write_snapshot(&self, dir: &Path) -> Result<DateTime<Utc>, SnapshotError> {
        let data = self.store.export_all().await?;
        let artifact = BackupArtifact::new(data);
        let json = serde_json::to_vec_pretty(&artifact)?;

        let tmp = dir.join(format!("{SNAPSHOT_FILE}.tmp"));
        tokio::fs::write(&tmp, &json).await?;
        tokio::fs::rename(&tmp, dir.join(SNAPSHOT_FILE)).await?;

        Ok(artifact.timestamp)
    }

    fn rearm(self: &Arc<Self>) {
        let mut timer = self.lock_timer();
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let this = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(SNAPSHOT_INTERVAL);
            // The first tick completes immediately; consume it so the
            // first snapshot lands one full interval after configure.
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let _ = this.run_once().await;
            }
        }));
    }

    fn lock_dir(&self) -> std::sync::MutexGuard<'_, Option<PathBuf>> {
        self.dir.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Check the grant still allows writes by creating and removing a probe
/// file. Detects both revoked permissions and a directory that is gone.
fn probe_writable(dir: &Path) -> Result<(), SnapshotError> {
    let probe = dir.join(PROBE_FILE);
    std::fs::write(&probe, b"probe").map_err(|_| SnapshotError::NotWritable {
        dir: dir.to_path_buf(),
    })?;
    let _ = std::fs::remove_file(&probe);
    Ok(())
}
