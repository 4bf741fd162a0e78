//! Data directory resolution

use std::path::PathBuf;

/// The application data directory
///
/// `$HOME/.gradekeeper`, falling back to a temp location when no home
/// directory can be determined (data will not survive reboots there).
#[must_use]
pub fn default_data_dir() -> PathBuf {
    if let Some(home) = dirs::home_dir() {
        return home.join(".gradekeeper");
    }
    std::env::temp_dir().join("gradekeeper-data")
}

/// Default path of the physical store
#[must_use]
pub fn default_db_path() -> PathBuf {
    default_data_dir().join("gradekeeper.db")
}
