//! Orchestration metadata stored in the reserved `appState` collection
//!
//! This is data, not out-of-band config: it lives in the same store as
//! every other collection, travels inside backups, and is wiped by a
//! hard reset like everything else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Remote backup credentials: a bearer token plus the `owner/repo`
/// identifier of the versioned-file host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteConfig {
    pub token: String,
    pub repo: String,
}

impl RemoteConfig {
    /// Whether the repo identifier has the required `owner/repo` shape
    #[must_use]
    pub fn repo_is_valid(&self) -> bool {
        let mut parts = self.repo.split('/');
        matches!(
            (parts.next(), parts.next(), parts.next()),
            (Some(owner), Some(repo), None) if !owner.is_empty() && !repo.is_empty()
        )
    }
}

/// Outcome of the host app's last automated report/email dispatch.
/// Written by the host, preserved here so it survives backup and restore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDispatch {
    pub at: DateTime<Utc>,
    pub ok: bool,
    #[serde(default)]
    pub detail: Option<String>,
}

/// The blob held by the `appState` collection
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppStateData {
    /// Granted local backup directory, if the user configured one
    #[serde(default)]
    pub local_backup_dir: Option<PathBuf>,
    /// Remote backup credentials, if configured
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    /// Timestamp of the last successful local snapshot
    #[serde(default)]
    pub last_local_backup_at: Option<DateTime<Utc>>,
    /// Timestamp of the last successful remote push
    #[serde(default)]
    pub last_remote_backup_at: Option<DateTime<Utc>>,
    /// Last automated report dispatch outcome
    #[serde(default)]
    pub last_report_dispatch: Option<ReportDispatch>,
}
