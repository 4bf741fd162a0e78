//! Save pipeline: dirty collection in, persisted blob out
//!
//! Every observed state change funnels through `schedule`. The status
//! indicator reflects "attempt completed" after a short settle delay,
//! not durability; a failed put is logged by the store facade and the
//! next state change overwrites it anyway.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use gradekeeper_core::collections::Collection;

use crate::guards::ResetGuard;
use crate::handle::SharedStore;

/// Delay before the indicator settles back to `Saved`
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// UI-facing save indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveStatus {
    Saved,
    Saving,
}

/// Per-collection save pipeline
pub struct SaveDebouncer {
    store: Arc<SharedStore>,
    reset: Arc<ResetGuard>,
    status: watch::Sender<SaveStatus>,
    settle: Mutex<Option<JoinHandle<()>>>,
}

impl SaveDebouncer {
    pub fn new(store: Arc<SharedStore>, reset: Arc<ResetGuard>) -> Self {
        let (status, _) = watch::channel(SaveStatus::Saved);
        Self {
            store,
            reset,
            status,
            settle: Mutex::new(None),
        }
    }

    /// Subscribe to the save indicator
    #[must_use]
    pub fn status(&self) -> watch::Receiver<SaveStatus> {
        self.status.subscribe()
    }

    /// Persist one changed collection
    ///
    /// No-op while a reset is quiescing the store, so a late save cannot
    /// resurrect data the user just asked to delete. Returns once the
    /// write attempt finished; the indicator settles back to `Saved` on
    /// its own after the delay.
    pub async fn schedule(&self, collection: Collection, value: Value) {
        if self.reset.in_progress() {
            debug!(%collection, "reset in progress, skipping save");
            return;
        }

        // A settle task from an earlier save must not flip the
        // indicator back mid-save.
        if let Some(previous) = self.lock_settle().take() {
            previous.abort();
        }

        self.status.send_replace(SaveStatus::Saving);
        self.store.put(collection, &value).await;

        let status = self.status.clone();
        *self.lock_settle() = Some(tokio::spawn(async move {
            tokio::time::sleep(SETTLE_DELAY).await;
            status.send_replace(SaveStatus::Saved);
        }));
    }

    fn lock_settle(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.settle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
