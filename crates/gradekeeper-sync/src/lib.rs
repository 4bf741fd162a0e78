//! Gradekeeper Sync - save pipeline, scheduled backups, reset/restore
//!
//! Orchestration over `gradekeeper-core`: the shared store handle with
//! single-flight open, the debounced save pipeline, the two backup
//! schedulers (local directory snapshot and remote push), and the
//! destructive reset/restore coordinator with its reentrancy guards.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod debounce;
pub mod guards;
pub mod handle;
pub mod local;
pub mod remote;
pub mod reset;
pub mod service;

pub use debounce::{SaveDebouncer, SaveStatus};
pub use guards::{InFlightGuard, ResetGuard};
pub use handle::SharedStore;
pub use local::{LocalSnapshotter, SnapshotOutcome};
pub use remote::{PushOutcome, RemoteSyncer, RunOutcome, SyncStatus};
pub use reset::{ResetCoordinator, ResetFailure, ResetPhase, RestoreError};
pub use service::SyncService;
