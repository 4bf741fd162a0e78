//! Shared store handle with single-flight open
//!
//! Exactly one live connection exists per process. Callers that race
//! `open` serialize on the slot mutex: the first opens, the rest reuse
//! the connection it opened. A SQLite-level failure drops the slot so
//! the next caller re-opens instead of reusing a dead connection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::warn;

use gradekeeper_core::collections::Collection;
use gradekeeper_core::state::AppStateData;
use gradekeeper_core::storage::{CollectionStore, Database, StoreError};

/// Process-wide handle to the physical store
pub struct SharedStore {
    path: PathBuf,
    slot: Mutex<Option<Database>>,
}

impl SharedStore {
    /// Create a handle for the store at `path`. Nothing is opened yet.
    pub fn new(path: impl Into<PathBuf>) -> Arc<Self> {
        Arc::new(Self {
            path: path.into(),
            slot: Mutex::new(None),
        })
    }

    /// Path of the physical store files
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the store if it is not already open
    ///
    /// Idempotent and single-flight: concurrent callers all succeed and
    /// share the one connection.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened
    pub async fn open(&self) -> Result<(), StoreError> {
        let mut slot = self.slot.lock().await;
        if slot.is_none() {
            *slot = Some(self.open_db()?);
        }
        Ok(())
    }

    /// Close the live connection, if any. The next operation re-opens.
    pub async fn close(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }

    /// Read a collection blob, falling back to `default` on absence or
    /// any read failure. Failures are logged, never raised: the app must
    /// stay usable with defaults.
    pub async fn get_or(&self, collection: Collection, default: Value) -> Value {
        match self.with_store(|store| store.get(collection)).await {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                warn!(%collection, error = %err, "read failed, serving default");
                default
            }
        }
    }

    /// Replace a collection blob. Failures are logged and dropped; the
    /// caller's next state change writes the collection again.
    pub async fn put(&self, collection: Collection, value: &Value) {
        if let Err(err) = self.with_store(|store| store.put(collection, value)).await {
            warn!(%collection, error = %err, "write failed, dropping update");
        }
    }

    /// Read every declared collection in one pass
    ///
    /// # Errors
    /// Returns an error if any read fails; backup cycles must observe
    /// failure rather than push a partial export
    pub async fn export_all(&self) -> Result<BTreeMap<Collection, Option<Value>>, StoreError> {
        self.with_store(|store| store.export_all()).await
    }

    /// Replace blobs wholesale for the collections present in `snapshot`
    ///
    /// Must only be called on a freshly opened handle after a reset.
    ///
    /// # Errors
    /// Returns an error if any write fails
    pub async fn import_all(
        &self,
        snapshot: &BTreeMap<Collection, Value>,
    ) -> Result<(), StoreError> {
        self.with_store(|store| store.import_all(snapshot)).await
    }

    /// Load the orchestration metadata blob, defaulting on absence or
    /// unreadable contents
    pub async fn load_app_state(&self) -> AppStateData {
        let value = self.get_or(Collection::AppState, Value::Null).await;
        serde_json::from_value(value).unwrap_or_default()
    }

    /// Persist the orchestration metadata blob
    pub async fn store_app_state(&self, state: &AppStateData) {
        match serde_json::to_value(state) {
            Ok(value) => self.put(Collection::AppState, &value).await,
            Err(err) => warn!(error = %err, "app state serialization failed"),
        }
    }

    /// Run one store operation against the live connection, opening it
    /// first if needed. On a SQLite-level error the connection is
    /// dropped so the next caller starts fresh; this is the guard
    /// against blocked or otherwise dead backend states.
    async fn with_store<T>(
        &self,
        f: impl FnOnce(&CollectionStore<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut slot = self.slot.lock().await;
        let db = match slot.take() {
            Some(db) => db,
            None => self.open_db()?,
        };

        let result = f(&CollectionStore::new(db.connection()));

        if matches!(result, Err(StoreError::Sqlite(_))) {
            drop(db);
        } else {
            *slot = Some(db);
        }
        result
    }

    fn open_db(&self) -> Result<Database, StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Database::open(&self.path)
    }
}
