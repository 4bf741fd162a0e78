//! Storage layer (SQLite collection tables)

pub mod db;
pub mod migrations;
pub mod reset;
pub mod store;

pub use db::{Database, StoreError};
pub use reset::{hard_reset, ResetError, ResetOutcome};
pub use store::CollectionStore;
