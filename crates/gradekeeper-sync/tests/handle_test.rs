//! Shared store handle tests
//!
//! Single-flight open, default-on-failure reads, and the facade's
//! swallow-and-log policy.

use gradekeeper_core::collections::Collection;
use gradekeeper_sync::SharedStore;
use serde_json::json;

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_opens_share_one_connection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SharedStore::new(dir.path().join("gradekeeper.db"));

    let mut tasks = Vec::new();
    for i in 0..8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.open().await.expect("open");
            store
                .put(Collection::Students, &json!([{"id": format!("s{i}")}]))
                .await;
        }));
    }
    for task in tasks {
        task.await.expect("join");
    }

    // Every caller got a usable handle: the last write is visible and a
    // fresh read works.
    let value = store.get_or(Collection::Students, json!([])).await;
    assert!(value.is_array());
    assert_eq!(value.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn get_or_returns_default_when_collection_is_absent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SharedStore::new(dir.path().join("gradekeeper.db"));

    let value = store.get_or(Collection::Fees, json!([])).await;
    assert_eq!(value, json!([]));
}

#[tokio::test]
async fn get_or_returns_default_when_the_backend_is_unusable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gradekeeper.db");

    // Not a database: the open fails, the failure is swallowed, and the
    // caller gets the default instead of an error.
    std::fs::write(&path, b"definitely not a sqlite file").expect("write garbage");

    let store = SharedStore::new(path);
    let value = store.get_or(Collection::Students, json!([])).await;
    assert_eq!(value, json!([]));
}

#[tokio::test]
async fn put_failure_is_swallowed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gradekeeper.db");
    std::fs::write(&path, b"definitely not a sqlite file").expect("write garbage");

    let store = SharedStore::new(path);
    // Must not panic or propagate.
    store.put(Collection::Students, &json!([{"id": "s1"}])).await;
}

#[tokio::test]
async fn close_then_operate_reopens_transparently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SharedStore::new(dir.path().join("gradekeeper.db"));

    store.put(Collection::Settings, &json!({"theme": "dark"})).await;
    store.close().await;

    let value = store.get_or(Collection::Settings, json!({})).await;
    assert_eq!(value, json!({"theme": "dark"}));
}

#[tokio::test]
async fn export_all_reports_every_declared_collection() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SharedStore::new(dir.path().join("gradekeeper.db"));

    store.put(Collection::Students, &json!([{"id": "s1"}])).await;

    let exported = store.export_all().await.expect("export");
    assert_eq!(exported.len(), Collection::ALL.len());
    assert_eq!(exported[&Collection::Students], Some(json!([{"id": "s1"}])));
    assert_eq!(exported[&Collection::Timetables], None);
}

#[tokio::test]
async fn app_state_round_trips() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SharedStore::new(dir.path().join("gradekeeper.db"));

    let mut state = store.load_app_state().await;
    assert!(state.remote.is_none());

    state.remote = Some(gradekeeper_core::RemoteConfig {
        token: "t0ken".to_string(),
        repo: "school/backups".to_string(),
    });
    store.store_app_state(&state).await;

    let reloaded = store.load_app_state().await;
    assert_eq!(
        reloaded.remote.map(|r| r.repo),
        Some("school/backups".to_string())
    );
}
