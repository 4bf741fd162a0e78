//! Destructive reset protocol
//!
//! The reset must leave every declared collection empty, even when the
//! physical store files cannot be deleted because another handle holds
//! them. The fallback clears every collection in place on a fresh
//! connection; only when both paths fail is the reset fatal.

use std::path::Path;

use thiserror::Error;

use crate::storage::db::{Database, StoreError};
use crate::storage::store::CollectionStore;

/// Which path of the reset protocol succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The physical store files were deleted outright.
    Deleted,
    /// Deletion was blocked; every collection was cleared in place.
    Cleared,
}

/// Errors during reset
#[derive(Error, Debug)]
pub enum ResetError {
    /// Both deletion and the clear fallback failed. There is no further
    /// fallback; the caller must surface this to the user.
    #[error("hard reset failed: delete: {delete}; clear fallback: {clear}")]
    Fatal { delete: String, clear: String },
}

/// Run the reset protocol against the store files at `path`
///
/// The caller must have closed its own handle first; an open connection
/// in this process would otherwise hold the files the deletion step is
/// about to remove.
///
/// # Errors
/// Returns [`ResetError::Fatal`] only when deletion and the clear
/// fallback both fail
pub fn hard_reset(path: &Path) -> Result<ResetOutcome, ResetError> {
    match delete_store_files(path) {
        Ok(()) => Ok(ResetOutcome::Deleted),
        Err(delete_err) => match clear_in_place(path) {
            Ok(()) => Ok(ResetOutcome::Cleared),
            Err(clear_err) => Err(ResetError::Fatal {
                delete: delete_err.to_string(),
                clear: clear_err.to_string(),
            }),
        },
    }
}

/// Delete the database file and its WAL sidecars.
///
/// A store that was never created counts as deleted. Sidecar removal is
/// best-effort; only the main file decides success.
fn delete_store_files(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }

    for suffix in ["-wal", "-shm"] {
        let mut sidecar = path.as_os_str().to_os_string();
        sidecar.push(suffix);
        let _ = std::fs::remove_file(sidecar);
    }

    Ok(())
}

/// Fallback: open a fresh handle and clear every collection in one
/// transaction. The handle closes on drop.
fn clear_in_place(path: &Path) -> Result<(), StoreError> {
    let db = Database::open(path)?;
    CollectionStore::new(db.connection()).clear_all()
}
