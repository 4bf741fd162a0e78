//! Backup artifacts and snapshot validation
//!
//! `{ timestamp, data }` is the canonical interchange shape: the local
//! snapshot file, the remote main artifact, and manual export/import all
//! use it. The credentials artifact is a deliberately separate, smaller
//! export so the sensitive records can be retained and rotated
//! independently of the main backups.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::collections::Collection;

/// A point-in-time bulk export of every declared collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupArtifact {
    /// When the export was taken
    pub timestamp: DateTime<Utc>,
    /// One entry per declared collection; never-written collections are
    /// present with a `null` value
    pub data: BTreeMap<Collection, Option<Value>>,
}

impl BackupArtifact {
    /// Wrap a bulk export taken now
    #[must_use]
    pub fn new(data: BTreeMap<Collection, Option<Value>>) -> Self {
        Self {
            timestamp: Utc::now(),
            data,
        }
    }
}

/// The credentials-only export pushed to the remote `credentials/` path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialsArtifact {
    pub timestamp: DateTime<Utc>,
    /// The user-account collection blob
    pub users: Option<Value>,
    /// The recovery secret lifted from the settings blob
    pub recovery_secret: Option<Value>,
}

/// Errors while validating an external snapshot
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot has no data object")]
    MissingData,

    #[error("snapshot data contains no known collection")]
    NoKnownCollection,
}

/// Validate an external snapshot and extract its collection blobs
///
/// Restore calls this before any destructive step: an unrecognizable or
/// corrupt snapshot must fail the whole operation while the store is
/// still intact. Unknown keys are ignored; `null` blobs are treated as
/// absent.
///
/// # Errors
/// Returns an error if the snapshot has no `data` object or names no
/// declared collection
pub fn parse_snapshot(raw: &Value) -> Result<BTreeMap<Collection, Value>, SnapshotError> {
    let data = raw
        .get("data")
        .and_then(Value::as_object)
        .ok_or(SnapshotError::MissingData)?;

    let mut out = BTreeMap::new();
    for (key, value) in data {
        if value.is_null() {
            continue;
        }
        if let Some(collection) = Collection::from_key(key) {
            out.insert(collection, value.clone());
        }
    }

    if out.is_empty() {
        return Err(SnapshotError::NoKnownCollection);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn artifact_serializes_with_collection_keys() {
        let mut data = BTreeMap::new();
        data.insert(Collection::Students, Some(json!([{"id": "s1"}])));
        data.insert(Collection::AppState, None);
        let artifact = BackupArtifact::new(data);

        let value = serde_json::to_value(&artifact).expect("serialize");
        assert_eq!(value["data"]["students"], json!([{"id": "s1"}]));
        assert_eq!(value["data"]["appState"], Value::Null);
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn parse_accepts_a_plain_export() {
        let raw = json!({
            "timestamp": "2026-08-29T10:00:00Z",
            "data": {
                "students": [{"id": "s1"}],
                "settings": {"theme": "dark"}
            }
        });

        let parsed = parse_snapshot(&raw).expect("parse");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[&Collection::Students], json!([{"id": "s1"}]));
    }

    #[test]
    fn parse_ignores_unknown_keys_and_null_blobs() {
        let raw = json!({
            "data": {
                "students": [{"id": "s1"}],
                "fees": null,
                "somethingElse": {"x": 1}
            }
        });

        let parsed = parse_snapshot(&raw).expect("parse");
        assert_eq!(parsed.len(), 1);
        assert!(parsed.contains_key(&Collection::Students));
    }

    #[test]
    fn parse_rejects_missing_data() {
        let raw = json!({"timestamp": "2026-08-29T10:00:00Z"});
        assert!(matches!(
            parse_snapshot(&raw),
            Err(SnapshotError::MissingData)
        ));
    }

    #[test]
    fn parse_rejects_snapshot_with_no_known_collection() {
        let raw = json!({"data": {"somethingElse": []}});
        assert!(matches!(
            parse_snapshot(&raw),
            Err(SnapshotError::NoKnownCollection)
        ));
    }
}
