//! SQLite-backed series store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{QualitySlot, Series, SeriesStore};
use crate::error::StoreError;

/// SQLite-backed series store. Quality slots are stored as JSON columns.
pub struct SqliteSeriesStore {
    conn: Mutex<Connection>,
}

/// Raw column values of one `series` row.
struct SeriesRow {
    name: String,
    last_episode_name: String,
    last_episode_at: String,
    sd: Option<String>,
    mp4: Option<String>,
    full_hd: Option<String>,
}

impl SqliteSeriesStore {
    /// Create a new SQLite series store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite series store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS series (
                name TEXT PRIMARY KEY,
                last_episode_name TEXT NOT NULL,
                last_episode_at TEXT NOT NULL,
                sd TEXT,
                mp4 TEXT,
                full_hd TEXT
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("series store lock poisoned".to_string()))
    }

    fn read_row(row: &Row<'_>) -> rusqlite::Result<SeriesRow> {
        Ok(SeriesRow {
            name: row.get(0)?,
            last_episode_name: row.get(1)?,
            last_episode_at: row.get(2)?,
            sd: row.get(3)?,
            mp4: row.get(4)?,
            full_hd: row.get(5)?,
        })
    }

    fn decode(row: SeriesRow) -> Result<Series, StoreError> {
        let last_episode_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&row.last_episode_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt(format!("series {}: {}", row.name, e)))?;

        Ok(Series {
            last_episode_name: row.last_episode_name,
            last_episode_at,
            sd: decode_slot(row.sd)?,
            mp4: decode_slot(row.mp4)?,
            full_hd: decode_slot(row.full_hd)?,
            name: row.name,
        })
    }
}

fn decode_slot(raw: Option<String>) -> Result<Option<QualitySlot>, StoreError> {
    raw.map(|json| serde_json::from_str(&json))
        .transpose()
        .map_err(StoreError::from)
}

fn encode_slot(slot: &Option<QualitySlot>) -> Result<Option<String>, StoreError> {
    slot.as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(StoreError::from)
}

const SELECT_COLUMNS: &str =
    "SELECT name, last_episode_name, last_episode_at, sd, mp4, full_hd FROM series";

impl SeriesStore for SqliteSeriesStore {
    fn load_all(&self) -> Result<Vec<Series>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY name", SELECT_COLUMNS))?;
        let rows = stmt
            .query_map([], Self::read_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::decode).collect()
    }

    fn get(&self, name: &str) -> Result<Option<Series>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!("{} WHERE name = ?", SELECT_COLUMNS),
                params![name],
                Self::read_row,
            )
            .optional()?;
        row.map(Self::decode).transpose()
    }

    fn save(&self, series: &Series) -> Result<(), StoreError> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO series (name, last_episode_name, last_episode_at, sd, mp4, full_hd)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET
                last_episode_name = excluded.last_episode_name,
                last_episode_at = excluded.last_episode_at,
                sd = excluded.sd,
                mp4 = excluded.mp4,
                full_hd = excluded.full_hd
            "#,
            params![
                series.name,
                series.last_episode_name,
                series.last_episode_at.to_rfc3339(),
                encode_slot(&series.sd)?,
                encode_slot(&series.mp4)?,
                encode_slot(&series.full_hd)?,
            ],
        )?;
        Ok(())
    }
}
