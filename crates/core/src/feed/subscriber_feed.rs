//! Bounded per-subscriber feeds.
//!
//! Every subscriber owns an ordered list of recently published items, newest
//! first, capped at the configured limit. Items pushed past the limit are
//! evicted and their personalized descriptors removed on a best-effort basis.

use std::path::Path;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::SubscriberFeedItem;
use crate::error::StoreError;
use crate::metrics;
use crate::subscriber::series_key;
use crate::torrent::DescriptorStore;

/// Trait for subscriber feed storage backends.
pub trait SubscriberFeedStore: Send + Sync {
    /// Stored items for a subscriber; empty if none.
    fn load(&self, subscriber_id: &str) -> Result<Vec<SubscriberFeedItem>, StoreError>;

    /// Replace the stored items for a subscriber.
    fn save(&self, subscriber_id: &str, items: &[SubscriberFeedItem]) -> Result<(), StoreError>;

    /// Remove a subscriber's feed. Returns whether one was stored.
    fn delete(&self, subscriber_id: &str) -> Result<bool, StoreError>;
}

/// SQLite-backed subscriber feed store; one JSON row per subscriber.
pub struct SqliteSubscriberFeedStore {
    conn: StdMutex<Connection>,
}

impl SqliteSubscriberFeedStore {
    pub fn new(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: StdMutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: StdMutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS subscriber_feeds (
                subscriber_id TEXT PRIMARY KEY,
                items TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("feed store lock poisoned".to_string()))
    }

    /// When a subscriber's feed was last written, if it exists.
    pub fn updated_at(&self, subscriber_id: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let conn = self.conn()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT updated_at FROM subscriber_feeds WHERE subscriber_id = ?",
                params![subscriber_id],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StoreError::Corrupt(format!("feed {}: {}", subscriber_id, e)))
        })
        .transpose()
    }
}

impl SubscriberFeedStore for SqliteSubscriberFeedStore {
    fn load(&self, subscriber_id: &str) -> Result<Vec<SubscriberFeedItem>, StoreError> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT items FROM subscriber_feeds WHERE subscriber_id = ?",
                params![subscriber_id],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(serde_json::from_str(&json)?),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, subscriber_id: &str, items: &[SubscriberFeedItem]) -> Result<(), StoreError> {
        let json = serde_json::to_string(items)?;
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO subscriber_feeds (subscriber_id, items, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(subscriber_id)
            DO UPDATE SET items = excluded.items, updated_at = excluded.updated_at
            "#,
            params![subscriber_id, json, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn delete(&self, subscriber_id: &str) -> Result<bool, StoreError> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM subscriber_feeds WHERE subscriber_id = ?",
            params![subscriber_id],
        )?;
        Ok(removed > 0)
    }
}

/// Result of removing evicted descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupOutcome {
    /// File names that were removed.
    pub deleted: Vec<String>,
    /// File names that could not be removed, with the error.
    pub failed: Vec<(String, String)>,
}

impl CleanupOutcome {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Result of appending to a subscriber feed.
#[derive(Debug, Clone)]
pub struct AppendResult {
    /// Items kept in the feed after the append, newest first.
    pub retained: Vec<SubscriberFeedItem>,
    pub cleanup: CleanupOutcome,
}

/// Maintains bounded subscriber feeds.
pub struct SubscriberFeedMaintainer {
    store: Arc<dyn SubscriberFeedStore>,
    descriptors: Arc<dyn DescriptorStore>,
    limit: usize,
    write_lock: Mutex<()>,
}

impl SubscriberFeedMaintainer {
    pub fn new(
        store: Arc<dyn SubscriberFeedStore>,
        descriptors: Arc<dyn DescriptorStore>,
        limit: usize,
    ) -> Self {
        Self {
            store,
            descriptors,
            limit: limit.max(1),
            write_lock: Mutex::new(()),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn load(&self, subscriber_id: &str) -> Result<Vec<SubscriberFeedItem>, StoreError> {
        self.store.load(subscriber_id)
    }

    /// Replace a subscriber's feed as-is.
    pub async fn save(
        &self,
        subscriber_id: &str,
        items: &[SubscriberFeedItem],
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.store.save(subscriber_id, items)
    }

    /// Add `item` to a subscriber's feed.
    ///
    /// An existing item with the same title (case-insensitive) is replaced.
    /// The feed is re-ordered newest first and cut at the limit; descriptors
    /// of the cut items are deleted after the feed is saved. Cleanup failures
    /// are reported in the result, never returned as errors.
    pub async fn append(
        &self,
        subscriber_id: &str,
        item: SubscriberFeedItem,
    ) -> Result<AppendResult, StoreError> {
        let (retained, evicted) = {
            let _guard = self.write_lock.lock().await;

            let mut items = self.store.load(subscriber_id)?;
            items.retain(|existing| !existing.same_title(&item));
            items.push(item);
            items.sort_by(SubscriberFeedItem::feed_order);

            let evicted = if items.len() > self.limit {
                items.split_off(self.limit)
            } else {
                Vec::new()
            };

            self.store.save(subscriber_id, &items)?;
            (items, evicted)
        };

        if !evicted.is_empty() {
            debug!(
                subscriber_id,
                evicted = evicted.len(),
                "Evicting items from subscriber feed"
            );
            metrics::FEED_EVICTIONS.inc_by(evicted.len() as u64);
        }

        let cleanup = self.cleanup(subscriber_id, &evicted, &retained).await;
        Ok(AppendResult { retained, cleanup })
    }

    /// Drop a subscriber's whole feed and every descriptor it references.
    pub async fn purge(&self, subscriber_id: &str) -> Result<CleanupOutcome, StoreError> {
        let items = {
            let _guard = self.write_lock.lock().await;
            let items = self.store.load(subscriber_id)?;
            self.store.delete(subscriber_id)?;
            items
        };

        debug!(subscriber_id, items = items.len(), "Purging subscriber feed");
        Ok(self.cleanup(subscriber_id, &items, &[]).await)
    }

    /// Drop every entry of `series_name` (case-insensitive) from a
    /// subscriber's feed and delete the descriptors only those entries used.
    /// Entries without a recorded series are kept.
    pub async fn remove_series(
        &self,
        subscriber_id: &str,
        series_name: &str,
    ) -> Result<CleanupOutcome, StoreError> {
        let key = series_key(series_name);
        let (removed, retained) = {
            let _guard = self.write_lock.lock().await;
            let (removed, retained): (Vec<_>, Vec<_>) = self
                .store
                .load(subscriber_id)?
                .into_iter()
                .partition(|item| {
                    item.series
                        .as_deref()
                        .is_some_and(|name| series_key(name) == key)
                });

            if !removed.is_empty() {
                self.store.save(subscriber_id, &retained)?;
            }
            (removed, retained)
        };

        if removed.is_empty() {
            return Ok(CleanupOutcome::default());
        }

        debug!(
            subscriber_id,
            series = series_name,
            items = removed.len(),
            "Removing series from subscriber feed"
        );
        Ok(self.cleanup(subscriber_id, &removed, &retained).await)
    }

    async fn cleanup(
        &self,
        subscriber_id: &str,
        evicted: &[SubscriberFeedItem],
        retained: &[SubscriberFeedItem],
    ) -> CleanupOutcome {
        let mut outcome = CleanupOutcome::default();

        for item in evicted {
            let file_name = item.file_name();
            // A retained entry may still point at the same file, e.g. two
            // titles the store sanitized to one name.
            if retained.iter().any(|r| r.file_name() == file_name) {
                continue;
            }

            match self
                .descriptors
                .delete_user_descriptor(subscriber_id, &file_name)
                .await
            {
                Ok(()) => outcome.deleted.push(file_name),
                Err(e) => {
                    warn!(subscriber_id, file = %file_name, error = %e, "Failed to delete evicted descriptor");
                    metrics::CLEANUP_FAILURES.inc();
                    outcome.failed.push((file_name, e.to_string()));
                }
            }
        }

        outcome
    }
}
