use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

use super::KeyValueStore;
use crate::error::StoreError;

/// SQLite-backed key-value table. Every write is a single statement.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(db_path).map_err(|e| StoreError::backend("open", e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::backend("configure", e))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StoreError::backend("configure", e))?;
        init(&conn)?;
        tracing::debug!(path = %db_path.display(), "sqlite store opened");
        Ok(Self { conn })
    }
}

fn init(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL,
          written_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );
        "#,
    )
    .map_err(|e| StoreError::backend("initialise", e))
}

impl KeyValueStore for SqliteStore {
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn
            .execute(
                r#"
                INSERT INTO entries (key, value)
                VALUES (?1, ?2)
                ON CONFLICT(key) DO UPDATE SET
                  value=excluded.value,
                  written_at=excluded.written_at
                "#,
                params![key, value],
            )
            .map_err(|e| StoreError::backend("write", e))?;
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.conn
            .query_row(
                "SELECT value FROM entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| StoreError::backend("read", e))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute("DELETE FROM entries WHERE key = ?1", params![key])
            .map_err(|e| StoreError::backend("delete", e))?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut stmt = self
            .conn
            .prepare("SELECT key FROM entries ORDER BY key")
            .map_err(|e| StoreError::backend("list", e))?;
        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| StoreError::backend("list", e))?;

        let mut keys = Vec::new();
        for r in rows {
            keys.push(r.map_err(|e| StoreError::backend("list", e))?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SubmissionStore;
    use crate::store::tests::submission;
    use tempfile::tempdir;

    #[test]
    fn submissions_survive_reopening() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("survey.db");

        let mut store = SubmissionStore::open(SqliteStore::open(&path).unwrap()).unwrap();
        let first = store.save(&submission("Ali Hassan")).unwrap();
        let second = store.save(&submission("Mariam Saad")).unwrap();
        drop(store);

        let store = SubmissionStore::open(SqliteStore::open(&path).unwrap()).unwrap();
        assert_eq!(store.keys(), [first, second]);
        let names: Vec<_> = store
            .all()
            .unwrap()
            .submissions
            .iter()
            .map(|s| s.entry.contact().full_name.clone())
            .collect();
        assert_eq!(names, ["Ali Hassan", "Mariam Saad"]);
    }

    #[test]
    fn set_overwrites_and_remove_deletes() {
        let dir = tempdir().unwrap();
        let mut kv = SqliteStore::open(&dir.path().join("kv.db")).unwrap();
        kv.set("draft", "a").unwrap();
        kv.set("draft", "b").unwrap();
        assert_eq!(kv.get("draft").unwrap().as_deref(), Some("b"));
        kv.remove("draft").unwrap();
        assert_eq!(kv.get("draft").unwrap(), None);
        assert!(kv.keys().unwrap().is_empty());
    }
}
