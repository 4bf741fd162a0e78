//! Periodic remote push of backup artifacts
//!
//! Every run writes two artifacts to the versioned-file host: the full
//! snapshot under `backups/` and the credentials-only artifact under
//! `credentials/`. The host has create-not-overwrite semantics, so each
//! run targets a fresh timestamp-derived path, and the in-flight guard
//! makes sure two runs can never push at once.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use gradekeeper_core::artifact::{BackupArtifact, CredentialsArtifact};
use gradekeeper_core::collections::Collection;
use gradekeeper_core::state::RemoteConfig;
use gradekeeper_core::storage::StoreError;

use crate::guards::{InFlightGuard, ResetGuard};
use crate::handle::SharedStore;

/// Interval between scheduled push runs
pub const SYNC_INTERVAL: Duration = Duration::from_secs(5 * 60);

const DEFAULT_API_BASE: &str = "https://api.github.com";
const USER_AGENT: &str = "gradekeeper";

/// Errors during a push cycle
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("remote repo identifier must look like owner/repo: {0}")]
    InvalidRepo(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote host returned {status} for {path}")]
    Host { status: u16, path: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// How a single artifact PUT ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PushOutcome {
    /// The remote created the file
    Created,
    /// The path already existed (422). The data is already backed up;
    /// not an error.
    AlreadyExists,
}

/// UI-facing sync status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum SyncStatus {
    Idle,
    Pushing,
    Success {
        at: DateTime<Utc>,
        outcome: PushOutcome,
    },
    Error {
        message: String,
    },
}

/// What one call to `run_once` did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Both artifacts were pushed
    Pushed(PushOutcome),
    /// Another run holds the in-flight slot
    SkippedInFlight,
    /// Reset in progress
    SkippedReset,
    /// Host reported offline
    SkippedOffline,
    /// No credentials configured
    NotConfigured,
    /// Push failed; status carries the error, nothing is raised
    Failed,
}

/// Scheduled pusher to the remote versioned-file host
///
/// Status updates go through `send_replace` so the channel always holds
/// the latest state, subscribers or not.
pub struct RemoteSyncer {
    store: Arc<SharedStore>,
    reset: Arc<ResetGuard>,
    in_flight: InFlightGuard,
    online: AtomicBool,
    config: Mutex<Option<RemoteConfig>>,
    client: reqwest::Client,
    api_base: String,
    status: watch::Sender<SyncStatus>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl RemoteSyncer {
    #[must_use]
    pub fn new(store: Arc<SharedStore>, reset: Arc<ResetGuard>) -> Self {
        let (status, _) = watch::channel(SyncStatus::Idle);
        Self {
            store,
            reset,
            in_flight: InFlightGuard::default(),
            online: AtomicBool::new(true),
            config: Mutex::new(None),
            client: reqwest::Client::new(),
            api_base: DEFAULT_API_BASE.to_string(),
            status,
            timer: Mutex::new(None),
        }
    }

    /// Point the syncer at a different host base URL (tests)
    #[must_use]
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Subscribe to the sync status indicator
    #[must_use]
    pub fn status(&self) -> watch::Receiver<SyncStatus> {
        self.status.subscribe()
    }

    /// Validate credentials, adopt them, and persist them into app state
    ///
    /// # Errors
    /// Returns an error if the repo identifier is malformed
    pub async fn save_config(&self, config: RemoteConfig) -> Result<(), RemoteError> {
        if !config.repo_is_valid() {
            return Err(RemoteError::InvalidRepo(config.repo));
        }

        let mut state = self.store.load_app_state().await;
        state.remote = Some(config.clone());
        self.store.store_app_state(&state).await;

        *self.lock_config() = Some(config);
        info!("remote backup credentials configured");
        Ok(())
    }

    /// Adopt credentials without re-persisting them (startup rehydration)
    pub fn adopt_config(&self, config: RemoteConfig) {
        *self.lock_config() = Some(config);
    }

    /// Forget credentials. The timer keeps running; runs short-circuit
    /// to a no-op until credentials are configured again.
    pub async fn forget_config(&self) {
        *self.lock_config() = None;

        let mut state = self.store.load_app_state().await;
        state.remote = None;
        self.store.store_app_state(&state).await;
        info!("remote backup credentials forgotten");
    }

    /// Feed the host application's connectivity signal
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// One push cycle. Never raises; every failure lands in the status
    /// channel instead of interrupting the host application.
    pub async fn run_once(&self) -> RunOutcome {
        let Some(config) = self.lock_config().clone() else {
            return RunOutcome::NotConfigured;
        };
        if !self.online.load(Ordering::SeqCst) {
            debug!("offline, skipping remote backup");
            return RunOutcome::SkippedOffline;
        }
        if self.reset.in_progress() {
            debug!("reset in progress, skipping remote backup");
            return RunOutcome::SkippedReset;
        }
        let Some(_token) = self.in_flight.try_acquire() else {
            debug!("push already in flight, skipping");
            return RunOutcome::SkippedInFlight;
        };

        self.status.send_replace(SyncStatus::Pushing);
        match self.push_cycle(&config).await {
            Ok(outcome) => {
                let at = Utc::now();
                let mut state = self.store.load_app_state().await;
                state.last_remote_backup_at = Some(at);
                self.store.store_app_state(&state).await;
                self.status.send_replace(SyncStatus::Success { at, outcome });
                RunOutcome::Pushed(outcome)
            }
            Err(err) => {
                warn!(error = %err, "remote backup failed");
                self.status.send_replace(SyncStatus::Error {
                    message: err.to_string(),
                });
                RunOutcome::Failed
            }
        }
    }

    /// Arm the scheduled timer. Runs short-circuit while unconfigured.
    pub fn start(self: &Arc<Self>) {
        let mut timer = self.lock_timer();
        if let Some(handle) = timer.take() {
            handle.abort();
        }

        let this = Arc::clone(self);
        *timer = Some(tokio::spawn(async move {
            let mut ticks = tokio::time::interval(SYNC_INTERVAL);
            ticks.tick().await;
            loop {
                ticks.tick().await;
                let _ = this.run_once().await;
            }
        }));
    }

    /// Export, then push the main artifact and the credentials artifact.
    ///
    /// The credentials push is attempted even when the main push failed;
    /// the two are independent and non-transactional. Any failure makes
    /// the whole run report an error, but never rolls the other back.
    async fn push_cycle(&self, config: &RemoteConfig) -> Result<PushOutcome, RemoteError> {
        let data = self.store.export_all().await?;
        let artifact = BackupArtifact::new(data);
        let stamp = artifact.timestamp;

        let main_path = format!(
            "backups/{}/gradekeeper-{}.json",
            stamp.format("%Y/%m"),
            stamp.format("%Y%m%d-%H%M%S-%3f")
        );
        let main_result = self
            .put_file(
                config,
                &main_path,
                &serde_json::to_vec_pretty(&artifact)?,
                "Scheduled Gradekeeper backup",
            )
            .await;

        let credentials = build_credentials_artifact(&artifact);
        let credentials_path = format!(
            "credentials/{}/gradekeeper-credentials-{}.json",
            stamp.format("%Y/%m"),
            stamp.format("%Y%m%d-%H%M%S-%3f")
        );
        let credentials_result = self
            .put_file(
                config,
                &credentials_path,
                &serde_json::to_vec_pretty(&credentials)?,
                "Gradekeeper credentials backup",
            )
            .await;

        match (main_result, credentials_result) {
            (Ok(main), Ok(_)) => Ok(main),
            (Err(err), _) | (_, Err(err)) => Err(err),
        }
    }

    /// Create one file on the remote host
    ///
    /// 2xx means created. 422 means the path already exists, which the
    /// create-only host uses to say "already backed up"; treated as
    /// success. Anything else is a soft failure.
    async fn put_file(
        &self,
        config: &RemoteConfig,
        path: &str,
        body: &[u8],
        message: &str,
    ) -> Result<PushOutcome, RemoteError> {
        let url = format!("{}/repos/{}/contents/{}", self.api_base, config.repo, path);
        let payload = serde_json::json!({
            "message": message,
            "content": BASE64_STANDARD.encode(body),
        });

        let response = self
            .client
            .put(&url)
            .bearer_auth(&config.token)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(PushOutcome::Created);
        }
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            debug!(path, "remote path already exists, treating as backed up");
            return Ok(PushOutcome::AlreadyExists);
        }

        Err(RemoteError::Host {
            status: status.as_u16(),
            path: path.to_string(),
        })
    }

    fn lock_config(&self) -> std::sync::MutexGuard<'_, Option<RemoteConfig>> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_timer(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The sensitive subset of a full export: the user-account collection
/// plus the recovery secret lifted from the settings blob.
fn build_credentials_artifact(artifact: &BackupArtifact) -> CredentialsArtifact {
    let users = artifact
        .data
        .get(&Collection::Users)
        .cloned()
        .flatten();
    let recovery_secret = artifact
        .data
        .get(&Collection::Settings)
        .cloned()
        .flatten()
        .and_then(|settings| settings.get("recoveryPin").cloned());

    CredentialsArtifact {
        timestamp: artifact.timestamp,
        users,
        recovery_secret,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn credentials_artifact_carries_users_and_recovery_pin() {
        let mut data = BTreeMap::new();
        data.insert(Collection::Users, Some(json!([{"name": "admin"}])));
        data.insert(
            Collection::Settings,
            Some(json!({"theme": "dark", "recoveryPin": "4812"})),
        );
        data.insert(Collection::Students, Some(json!([{"id": "s1"}])));
        let artifact = BackupArtifact::new(data);

        let credentials = build_credentials_artifact(&artifact);
        assert_eq!(credentials.users, Some(json!([{"name": "admin"}])));
        assert_eq!(credentials.recovery_secret, Some(json!("4812")));
        assert_eq!(credentials.timestamp, artifact.timestamp);
    }

    #[test]
    fn credentials_artifact_tolerates_missing_collections() {
        let artifact = BackupArtifact::new(BTreeMap::new());
        let credentials = build_credentials_artifact(&artifact);
        assert_eq!(credentials.users, None);
        assert_eq!(credentials.recovery_secret, None);
    }
}
