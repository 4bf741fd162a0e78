//! Gradekeeper Core - collection store, migrations, and reset protocol
//!
//! This crate provides the SQLite-backed whole-collection store the
//! Gradekeeper app persists into, the additive schema migrations, the
//! destructive reset protocol, and the backup artifact types shared by
//! the local and remote backup channels.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic)]

pub mod artifact;
pub mod collections;
pub mod paths;
pub mod state;
pub mod storage;

pub use artifact::{BackupArtifact, CredentialsArtifact};
pub use collections::Collection;
pub use state::{AppStateData, RemoteConfig};
pub use storage::Database;
