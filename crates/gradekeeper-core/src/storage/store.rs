//! Whole-collection blob storage

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::{params, Connection};
use serde_json::Value;

use crate::collections::Collection;
use crate::storage::db::StoreError;

/// Collection blob operations
///
/// Every operation addresses the single blob row of one collection
/// table. Errors are strict here; the swallow-and-log policy for reads
/// and writes lives in the orchestration layer above.
pub struct CollectionStore<'a> {
    conn: &'a Connection,
}

impl<'a> CollectionStore<'a> {
    /// Create a new collection store
    #[must_use]
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Get the blob for a collection, or `None` if it was never written
    ///
    /// # Errors
    /// Returns an error if the read or JSON parse fails
    pub fn get(&self, collection: Collection) -> Result<Option<Value>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT data FROM {} WHERE slot = 0", collection.table()))?;

        let result = stmt.query_row([], |row| {
            let json: String = row.get(0)?;
            Ok(json)
        });

        match result {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the entire blob for a collection
    ///
    /// # Errors
    /// Returns an error if serialization or the write fails
    pub fn put(&self, collection: Collection, value: &Value) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;

        self.conn.execute(
            &format!(
                r"
                INSERT INTO {} (slot, data, updated_at) VALUES (0, ?1, ?2)
                ON CONFLICT(slot) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
                ",
                collection.table()
            ),
            params![json, Utc::now().to_rfc3339()],
        )?;

        Ok(())
    }

    /// Clear every declared collection inside one transaction
    ///
    /// This is the in-place fallback of the hard-reset protocol: tables
    /// stay, blobs go.
    ///
    /// # Errors
    /// Returns an error if any delete fails; nothing is cleared then
    pub fn clear_all(&self) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        for collection in Collection::ALL {
            tx.execute(&format!("DELETE FROM {}", collection.table()), [])?;
        }
        tx.commit()?;
        Ok(())
    }

    /// Read every declared collection in one pass
    ///
    /// The returned map holds a key for every declared collection;
    /// never-written collections map to `None`.
    ///
    /// # Errors
    /// Returns an error if any read fails
    pub fn export_all(&self) -> Result<BTreeMap<Collection, Option<Value>>, StoreError> {
        let mut out = BTreeMap::new();
        for collection in Collection::ALL {
            out.insert(collection, self.get(collection)?);
        }
        Ok(out)
    }

    /// Replace blobs wholesale for every collection present in `snapshot`
    ///
    /// Collections absent from `snapshot` are left untouched. Runs inside
    /// one transaction so a failed import replaces nothing.
    ///
    /// # Errors
    /// Returns an error if any write fails
    pub fn import_all(&self, snapshot: &BTreeMap<Collection, Value>) -> Result<(), StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();
        for (collection, value) in snapshot {
            let json = serde_json::to_string(value)?;
            tx.execute(
                &format!(
                    r"
                    INSERT INTO {} (slot, data, updated_at) VALUES (0, ?1, ?2)
                    ON CONFLICT(slot) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at
                    ",
                    collection.table()
                ),
                params![json, now],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use serde_json::json;

    #[test]
    fn put_then_get_returns_the_blob() {
        let db = Database::in_memory().expect("open");
        let store = CollectionStore::new(db.connection());

        store
            .put(Collection::Students, &json!([{"id": "s1"}]))
            .expect("put");

        let value = store.get(Collection::Students).expect("get");
        assert_eq!(value, Some(json!([{"id": "s1"}])));
    }

    #[test]
    fn get_on_never_written_collection_is_none() {
        let db = Database::in_memory().expect("open");
        let store = CollectionStore::new(db.connection());

        assert_eq!(store.get(Collection::Fees).expect("get"), None);
    }

    #[test]
    fn put_replaces_the_whole_blob() {
        let db = Database::in_memory().expect("open");
        let store = CollectionStore::new(db.connection());

        store
            .put(Collection::Settings, &json!({"theme": "light"}))
            .expect("put");
        store
            .put(Collection::Settings, &json!({"locale": "en"}))
            .expect("put");

        assert_eq!(
            store.get(Collection::Settings).expect("get"),
            Some(json!({"locale": "en"}))
        );
    }

    #[test]
    fn clear_all_empties_every_collection() {
        let db = Database::in_memory().expect("open");
        let store = CollectionStore::new(db.connection());

        for collection in Collection::ALL {
            store.put(collection, &json!({"k": "v"})).expect("put");
        }

        store.clear_all().expect("clear all");

        for collection in Collection::ALL {
            assert_eq!(store.get(collection).expect("get"), None);
        }
    }

    #[test]
    fn import_all_leaves_absent_collections_untouched() {
        let db = Database::in_memory().expect("open");
        let store = CollectionStore::new(db.connection());

        store
            .put(Collection::Fees, &json!([{"id": "f1"}]))
            .expect("put");

        let mut snapshot = BTreeMap::new();
        snapshot.insert(Collection::Students, json!([{"id": "s9"}]));
        store.import_all(&snapshot).expect("import");

        assert_eq!(
            store.get(Collection::Students).expect("get"),
            Some(json!([{"id": "s9"}]))
        );
        assert_eq!(
            store.get(Collection::Fees).expect("get"),
            Some(json!([{"id": "f1"}]))
        );
    }
}
