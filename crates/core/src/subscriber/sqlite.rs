//! SQLite-backed subscriber store implementation.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::types::series_key;
use super::{Subscriber, SubscriberStore, Subscription};
use crate::episode::Quality;
use crate::error::StoreError;

/// SQLite-backed subscriber store.
pub struct SqliteSubscriberStore {
    conn: Mutex<Connection>,
}

impl SqliteSubscriberStore {
    /// Create a new SQLite subscriber store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite subscriber store (useful for testing).
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
            CREATE TABLE IF NOT EXISTS subscribers (
                id TEXT PRIMARY KEY,
                tracking_token TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS subscriptions (
                subscriber_id TEXT NOT NULL,
                series_key TEXT NOT NULL,
                series_name TEXT NOT NULL,
                quality TEXT NOT NULL,
                PRIMARY KEY (subscriber_id, series_key)
            );

            CREATE INDEX IF NOT EXISTS idx_subscriptions_series
                ON subscriptions(series_key, quality);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("subscriber store lock poisoned".to_string()))
    }

    fn load_subscriptions(
        conn: &Connection,
        subscriber_id: &str,
    ) -> Result<Vec<Subscription>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT series_name, quality FROM subscriptions WHERE subscriber_id = ? ORDER BY series_key",
        )?;
        let rows = stmt
            .query_map(params![subscriber_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(series_name, quality)| {
                let quality = quality
                    .parse::<Quality>()
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?;
                Ok(Subscription::new(series_name, quality))
            })
            .collect()
    }

    fn row_to_subscriber(
        conn: &Connection,
        id: String,
        tracking_token: String,
        created_at: String,
    ) -> Result<Subscriber, StoreError> {
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::Corrupt(format!("subscriber {}: {}", id, e)))?;
        let subscriptions = Self::load_subscriptions(conn, &id)?;
        Ok(Subscriber {
            id,
            tracking_token,
            subscriptions,
            created_at,
        })
    }

    fn upsert_subscription(
        conn: &Connection,
        subscriber_id: &str,
        subscription: &Subscription,
    ) -> Result<(), StoreError> {
        conn.execute(
            r#"
            INSERT INTO subscriptions (subscriber_id, series_key, series_name, quality)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(subscriber_id, series_key)
            DO UPDATE SET series_name = excluded.series_name, quality = excluded.quality
            "#,
            params![
                subscriber_id,
                series_key(&subscription.series_name),
                subscription.series_name,
                subscription.quality.as_str(),
            ],
        )?;
        Ok(())
    }
}

impl SubscriberStore for SqliteSubscriberStore {
    fn get(&self, id: &str) -> Result<Option<Subscriber>, StoreError> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT id, tracking_token, created_at FROM subscribers WHERE id = ?",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((id, token, created_at)) => {
                Self::row_to_subscriber(&conn, id, token, created_at).map(Some)
            }
            None => Ok(None),
        }
    }

    fn list(&self) -> Result<Vec<Subscriber>, StoreError> {
        let conn = self.conn()?;
        let rows = {
            let mut stmt =
                conn.prepare("SELECT id, tracking_token, created_at FROM subscribers ORDER BY id")?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
                .collect::<Result<Vec<(String, String, String)>, _>>()?;
            rows
        };

        rows.into_iter()
            .map(|(id, token, created_at)| Self::row_to_subscriber(&conn, id, token, created_at))
            .collect()
    }

    fn save(&self, subscriber: &Subscriber) -> Result<(), StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO subscribers (id, tracking_token, created_at) VALUES (?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET tracking_token = excluded.tracking_token
            "#,
            params![
                subscriber.id,
                subscriber.tracking_token,
                subscriber.created_at.to_rfc3339(),
            ],
        )?;
        tx.execute(
            "DELETE FROM subscriptions WHERE subscriber_id = ?",
            params![subscriber.id],
        )?;
        for subscription in &subscriber.subscriptions {
            Self::upsert_subscription(&tx, &subscriber.id, subscription)?;
        }

        tx.commit()?;
        Ok(())
    }

    fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM subscriptions WHERE subscriber_id = ?",
            params![id],
        )?;
        let removed = tx.execute("DELETE FROM subscribers WHERE id = ?", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    fn set_subscription(
        &self,
        subscriber_id: &str,
        series_name: &str,
        quality: Quality,
    ) -> Result<(), StoreError> {
        let conn = self.conn()?;
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM subscribers WHERE id = ?)",
            params![subscriber_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(StoreError::NotFound(format!("subscriber {}", subscriber_id)));
        }

        Self::upsert_subscription(&conn, subscriber_id, &Subscription::new(series_name, quality))
    }

    fn remove_subscription(&self, subscriber_id: &str, series_name: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM subscriptions WHERE subscriber_id = ? AND series_key = ?",
            params![subscriber_id, series_key(series_name)],
        )?;
        Ok(removed > 0)
    }

    fn find_subscribers(
        &self,
        series_name: &str,
        quality: Quality,
    ) -> Result<Vec<String>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT subscriber_id FROM subscriptions WHERE series_key = ? AND quality = ? ORDER BY subscriber_id",
        )?;
        let ids = stmt
            .query_map(params![series_key(series_name), quality.as_str()], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> SqliteSubscriberStore {
        SqliteSubscriberStore::in_memory().unwrap()
    }

    #[test]
    fn test_save_and_get() {
        let store = store();
        let mut sub = Subscriber::new("42", "token-42");
        sub.subscribe("Флэш (The Flash)", Quality::Mp4);
        store.save(&sub).unwrap();

        let loaded = store.get("42").unwrap().unwrap();
        assert_eq!(loaded.tracking_token, "token-42");
        assert_eq!(loaded.subscriptions, sub.subscriptions);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_set_subscription_replaces_quality() {
        let store = store();
        store.save(&Subscriber::new("42", "t")).unwrap();

        store
            .set_subscription("42", "Флэш (The Flash)", Quality::Sd)
            .unwrap();
        store
            .set_subscription("42", "ФЛЭШ (THE FLASH)", Quality::FullHd)
            .unwrap();

        let loaded = store.get("42").unwrap().unwrap();
        assert_eq!(loaded.subscriptions.len(), 1);
        assert_eq!(loaded.subscriptions[0].quality, Quality::FullHd);
        assert_eq!(loaded.subscriptions[0].series_name, "ФЛЭШ (THE FLASH)");
    }

    #[test]
    fn test_set_subscription_for_unknown_subscriber_fails() {
        let store = store();
        let result = store.set_subscription("nobody", "Флэш (The Flash)", Quality::Sd);
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_find_subscribers_by_series_and_quality() {
        let store = store();
        let mut a = Subscriber::new("a", "ta");
        a.subscribe("Флэш (The Flash)", Quality::Mp4);
        let mut b = Subscriber::new("b", "tb");
        b.subscribe("флэш (the flash)", Quality::FullHd);
        let mut c = Subscriber::new("c", "tc");
        c.subscribe("Флэш (The Flash)", Quality::Mp4);
        for sub in [&a, &b, &c] {
            store.save(sub).unwrap();
        }

        let mp4 = store
            .find_subscribers("Флэш (The Flash)", Quality::Mp4)
            .unwrap();
        assert_eq!(mp4, vec!["a".to_string(), "c".to_string()]);

        let full_hd = store
            .find_subscribers("ФЛЭШ (The Flash)", Quality::FullHd)
            .unwrap();
        assert_eq!(full_hd, vec!["b".to_string()]);

        assert!(store
            .find_subscribers("Флэш (The Flash)", Quality::Sd)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_remove_subscription_and_delete() {
        let store = store();
        let mut sub = Subscriber::new("42", "t");
        sub.subscribe("Флэш (The Flash)", Quality::Mp4);
        store.save(&sub).unwrap();

        assert!(store.remove_subscription("42", "флэш (the flash)").unwrap());
        assert!(!store.remove_subscription("42", "флэш (the flash)").unwrap());

        assert!(store.delete("42").unwrap());
        assert!(!store.delete("42").unwrap());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.db");

        {
            let store = SqliteSubscriberStore::new(&path).unwrap();
            let mut sub = Subscriber::new("42", "t");
            sub.subscribe("Флэш (The Flash)", Quality::Sd);
            store.save(&sub).unwrap();
        }

        let store = SqliteSubscriberStore::new(&path).unwrap();
        let all = store.list().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].subscriptions.len(), 1);
    }
}
