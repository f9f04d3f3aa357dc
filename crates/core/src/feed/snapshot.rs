//! Persistence of the last fully processed upstream snapshot.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use super::types::Snapshot;
use crate::error::StoreError;

/// Trait for snapshot storage backends.
pub trait SnapshotStore: Send + Sync {
    /// The last persisted snapshot; empty if none was ever saved.
    fn load_last(&self) -> Result<Snapshot, StoreError>;

    /// Replace the persisted snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;
}

/// SQLite-backed snapshot store. Keeps a single JSON row.
pub struct SqliteSnapshotStore {
    conn: Mutex<Connection>,
}

impl SqliteSnapshotStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS feed_snapshot (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                items TEXT NOT NULL,
                saved_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("snapshot store lock poisoned".to_string()))
    }
}

impl SnapshotStore for SqliteSnapshotStore {
    fn load_last(&self) -> Result<Snapshot, StoreError> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row("SELECT items FROM feed_snapshot WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Snapshot::default()),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let json = serde_json::to_string(snapshot)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO feed_snapshot (id, items, saved_at) VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE SET items = excluded.items, saved_at = excluded.saved_at
            "#,
            params![json, chrono::Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
