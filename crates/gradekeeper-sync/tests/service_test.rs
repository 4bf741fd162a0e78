//! End-to-end service wiring tests

use gradekeeper_core::collections::Collection;
use gradekeeper_core::storage::ResetOutcome;
use gradekeeper_sync::SyncService;
use serde_json::json;

#[tokio::test]
async fn save_then_load_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = SyncService::new(dir.path().join("gradekeeper.db"));
    service.start().await;

    service
        .save(Collection::Students, json!([{"id": "s1"}]))
        .await;

    assert_eq!(
        service.load(Collection::Students, json!([])).await,
        json!([{"id": "s1"}])
    );
}

#[tokio::test]
async fn local_backup_configuration_survives_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backup_dir = tempfile::tempdir().expect("backup dir");
    let db_path = dir.path().join("gradekeeper.db");

    {
        let service = SyncService::new(db_path.clone());
        service.start().await;
        service
            .configure_local_backup(backup_dir.path().to_path_buf())
            .await
            .expect("configure");
    }

    // A new process rehydrates the grant from app state.
    let service = SyncService::new(db_path);
    service.start().await;
    assert_eq!(
        service.local_snapshotter().configured_dir().as_deref(),
        Some(backup_dir.path())
    );
}

#[tokio::test]
async fn disabling_local_backup_clears_the_persisted_grant() {
    let dir = tempfile::tempdir().expect("tempdir");
    let backup_dir = tempfile::tempdir().expect("backup dir");
    let service = SyncService::new(dir.path().join("gradekeeper.db"));
    service.start().await;

    service
        .configure_local_backup(backup_dir.path().to_path_buf())
        .await
        .expect("configure");

    service.disable_local_backup().await;

    assert_eq!(service.local_snapshotter().configured_dir(), None);
    assert!(service.app_state().await.local_backup_dir.is_none());
}

#[tokio::test]
async fn hard_reset_through_the_service_empties_the_store() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = SyncService::new(dir.path().join("gradekeeper.db"));
    service.start().await;

    service.save(Collection::Fees, json!([{"id": "f1"}])).await;

    let outcome = service.hard_reset().await.expect("reset");
    assert_eq!(outcome, ResetOutcome::Deleted);

    assert_eq!(service.load(Collection::Fees, json!([])).await, json!([]));
}

#[tokio::test]
async fn restore_through_the_service_applies_the_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = SyncService::new(dir.path().join("gradekeeper.db"));
    service.start().await;

    service
        .save(Collection::Teachers, json!([{"id": "old"}]))
        .await;

    let snapshot = json!({
        "timestamp": "2026-08-29T10:00:00Z",
        "data": {"teachers": [{"id": "t1"}]}
    });
    service.restore(&snapshot).await.expect("restore");

    assert_eq!(
        service.load(Collection::Teachers, json!([])).await,
        json!([{"id": "t1"}])
    );
}

#[tokio::test]
async fn manual_sync_without_credentials_is_a_no_op() {
    let dir = tempfile::tempdir().expect("tempdir");
    let service = SyncService::new(dir.path().join("gradekeeper.db"));
    service.start().await;

    assert_eq!(
        service.trigger_manual_sync().await,
        gradekeeper_sync::RunOutcome::NotConfigured
    );
}
