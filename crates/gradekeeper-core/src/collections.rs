//! Declared collections and schema version

use serde::{Deserialize, Serialize};

/// Declared schema version for the physical store.
///
/// Opening a store whose on-disk version is older creates any missing
/// collection tables. Collections are additive only; no version ever
/// transforms or drops existing data.
pub const SCHEMA_VERSION: i32 = 2;

/// A named logical table of the application.
///
/// Each collection holds exactly one opaque JSON blob (the whole
/// collection as one document). The store never interprets blob contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Students,
    Fees,
    Teachers,
    Classes,
    Timetables,
    Settings,
    Users,
    /// Reserved collection holding orchestration metadata (backup
    /// directory, remote credentials, last-backup timestamps).
    AppState,
}

impl Collection {
    /// Every declared collection, in storage order.
    pub const ALL: [Collection; 8] = [
        Collection::Students,
        Collection::Fees,
        Collection::Teachers,
        Collection::Classes,
        Collection::Timetables,
        Collection::Settings,
        Collection::Users,
        Collection::AppState,
    ];

    /// SQLite table name backing this collection.
    #[must_use]
    pub fn table(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Fees => "fees",
            Collection::Teachers => "teachers",
            Collection::Classes => "classes",
            Collection::Timetables => "timetables",
            Collection::Settings => "settings",
            Collection::Users => "users",
            Collection::AppState => "app_state",
        }
    }

    /// JSON key for this collection in backup artifacts.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Collection::Students => "students",
            Collection::Fees => "fees",
            Collection::Teachers => "teachers",
            Collection::Classes => "classes",
            Collection::Timetables => "timetables",
            Collection::Settings => "settings",
            Collection::Users => "users",
            Collection::AppState => "appState",
        }
    }

    /// Schema version that introduced this collection.
    #[must_use]
    pub fn since_version(self) -> i32 {
        match self {
            Collection::Students
            | Collection::Fees
            | Collection::Teachers
            | Collection::Classes
            | Collection::Timetables
            | Collection::Settings => 1,
            Collection::Users | Collection::AppState => 2,
        }
    }

    /// Look up a collection by its artifact JSON key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Collection::ALL.into_iter().find(|c| c.key() == key)
    }
}

impl std::fmt::Display for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}
