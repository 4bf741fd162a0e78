//! Database migrations
//!
//! Migrations are strictly additive: each version introduces collection
//! tables and nothing else. Existing blobs are never touched.

use rusqlite::Connection;

use super::db::StoreError;
use crate::collections::{Collection, SCHEMA_VERSION};

/// Run all pending migrations
///
/// # Errors
/// Returns an error if migrations fail
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let version: i32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < SCHEMA_VERSION {
        create_missing_collections(conn)?;
    }

    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Create the table for every declared collection that does not exist yet.
///
/// Each collection table holds a single row: the whole collection as one
/// JSON document.
fn create_missing_collections(conn: &Connection) -> Result<(), StoreError> {
    let mut batch = String::new();
    for collection in Collection::ALL {
        batch.push_str(&format!(
            r"
            CREATE TABLE IF NOT EXISTS {} (
                slot INTEGER PRIMARY KEY CHECK (slot = 0),
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
            collection.table()
        ));
    }
    conn.execute_batch(&batch)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().expect("open");
        run_migrations(&conn).expect("first run");
        run_migrations(&conn).expect("second run");

        let version: i32 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("version");
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[test]
    fn every_collection_table_exists_after_migration() {
        let conn = Connection::open_in_memory().expect("open");
        run_migrations(&conn).expect("migrate");

        for collection in Collection::ALL {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                    [collection.table()],
                    |row| row.get(0),
                )
                .expect("query");
            assert_eq!(count, 1, "missing table for {collection}");
        }
    }
}
