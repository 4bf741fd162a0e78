//! In-process orchestration surface
//!
//! One `SyncService` per process wires the shared store, the save
//! pipeline, both backup schedulers, and the reset coordinator, and
//! rehydrates orchestration state from the `appState` collection at
//! startup. The host application calls these methods directly; there is
//! no external command surface.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tracing::warn;

use gradekeeper_core::collections::Collection;
use gradekeeper_core::paths;
use gradekeeper_core::state::{AppStateData, RemoteConfig};
use gradekeeper_core::storage::ResetOutcome;

use crate::debounce::{SaveDebouncer, SaveStatus};
use crate::guards::ResetGuard;
use crate::handle::SharedStore;
use crate::local::{LocalSnapshotter, SnapshotError};
use crate::remote::{RemoteError, RemoteSyncer, RunOutcome, SyncStatus};
use crate::reset::{ResetCoordinator, ResetFailure, ResetPhase, RestoreError};

/// The persistence and backup core of the application
pub struct SyncService {
    store: Arc<SharedStore>,
    debouncer: SaveDebouncer,
    local: Arc<LocalSnapshotter>,
    remote: Arc<RemoteSyncer>,
    coordinator: ResetCoordinator,
}

impl SyncService {
    /// Wire the service against the store at `db_path`
    #[must_use]
    pub fn new(db_path: PathBuf) -> Self {
        let store = SharedStore::new(db_path);
        let reset = Arc::new(ResetGuard::default());

        Self {
            debouncer: SaveDebouncer::new(Arc::clone(&store), Arc::clone(&reset)),
            local: LocalSnapshotter::new(Arc::clone(&store), Arc::clone(&reset)),
            remote: Arc::new(RemoteSyncer::new(Arc::clone(&store), Arc::clone(&reset))),
            coordinator: ResetCoordinator::new(Arc::clone(&store), Arc::clone(&reset)),
            store,
        }
    }

    /// Wire the service against the default data directory
    #[must_use]
    pub fn with_default_path() -> Self {
        Self::new(paths::default_db_path())
    }

    /// Open the store, rehydrate orchestration state, and arm the
    /// scheduled backups
    ///
    /// A failed local-directory rehydration is logged and dropped (the
    /// grant may have been revoked while the app was closed); everything
    /// else starts regardless.
    pub async fn start(&self) {
        if let Err(err) = self.store.open().await {
            warn!(error = %err, "store open failed at startup, continuing with defaults");
        }

        let state = self.store.load_app_state().await;
        if let Some(dir) = state.local_backup_dir {
            if let Err(err) = self.local.configure(dir) {
                warn!(error = %err, "saved backup directory no longer usable");
            }
        }
        if let Some(config) = state.remote {
            self.remote.adopt_config(config);
        }
        self.remote.start();
    }

    /// Persist one changed collection through the save pipeline
    pub async fn save(&self, collection: Collection, value: Value) {
        self.debouncer.schedule(collection, value).await;
    }

    /// Read a collection blob, with `default` on absence or failure
    pub async fn load(&self, collection: Collection, default: Value) -> Value {
        self.store.get_or(collection, default).await
    }

    /// Grant a local backup directory and arm the snapshot timer
    ///
    /// # Errors
    /// Returns an error if the directory cannot be written to
    pub async fn configure_local_backup(&self, dir: PathBuf) -> Result<(), SnapshotError> {
        self.local.configure(dir.clone())?;

        let mut state = self.store.load_app_state().await;
        state.local_backup_dir = Some(dir);
        self.store.store_app_state(&state).await;
        Ok(())
    }

    /// Drop the local backup grant, stop the snapshot timer, and clear
    /// the persisted directory
    pub async fn disable_local_backup(&self) {
        self.local.disable();

        let mut state = self.store.load_app_state().await;
        state.local_backup_dir = None;
        self.store.store_app_state(&state).await;
    }

    /// Store remote credentials and keep the scheduled push armed
    ///
    /// # Errors
    /// Returns an error if the repo identifier is malformed
    pub async fn save_remote_config(&self, config: RemoteConfig) -> Result<(), RemoteError> {
        self.remote.save_config(config).await
    }

    /// Forget remote credentials; scheduled runs become no-ops
    pub async fn forget_remote_config(&self) {
        self.remote.forget_config().await;
    }

    /// User-initiated "sync now"; shares the in-flight guard with the
    /// scheduled runs
    pub async fn trigger_manual_sync(&self) -> RunOutcome {
        self.remote.run_once().await
    }

    /// Feed the host application's connectivity signal
    pub fn set_online(&self, online: bool) {
        self.remote.set_online(online);
    }

    /// Empty every collection (destructive)
    ///
    /// # Errors
    /// Returns an error if a reset is already running or both reset
    /// paths fail
    pub async fn hard_reset(&self) -> Result<ResetOutcome, ResetFailure> {
        self.coordinator.hard_reset().await
    }

    /// Overwrite the full state from an external snapshot (destructive)
    ///
    /// # Errors
    /// Returns an error for an invalid snapshot, a fatal reset, or a
    /// failed import
    pub async fn restore(&self, snapshot: &Value) -> Result<ResetOutcome, RestoreError> {
        self.coordinator.restore(snapshot).await
    }

    /// Current orchestration metadata
    pub async fn app_state(&self) -> AppStateData {
        self.store.load_app_state().await
    }

    /// Save indicator for the UI
    #[must_use]
    pub fn save_status(&self) -> watch::Receiver<SaveStatus> {
        self.debouncer.status()
    }

    /// Remote sync indicator for the UI
    #[must_use]
    pub fn sync_status(&self) -> watch::Receiver<SyncStatus> {
        self.remote.status()
    }

    /// Reset/restore phase for the UI
    #[must_use]
    pub fn reset_phase(&self) -> watch::Receiver<ResetPhase> {
        self.coordinator.phase()
    }

    /// The shared store handle
    #[must_use]
    pub fn store(&self) -> &Arc<SharedStore> {
        &self.store
    }

    /// Direct access to the snapshotter (manual "back up now")
    #[must_use]
    pub fn local_snapshotter(&self) -> &Arc<LocalSnapshotter> {
        &self.local
    }

    /// Direct access to the remote syncer
    #[must_use]
    pub fn remote_syncer(&self) -> &Arc<RemoteSyncer> {
        &self.remote
    }
}
