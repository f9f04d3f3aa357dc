//! Subscribers, their tracker tokens and series subscriptions.
//!
//! The outer surface edits subscribers through [`SubscriberRegistry`]; the
//! sync engine only reads the store.

mod registry;
mod sqlite;
mod types;

pub use registry::SubscriberRegistry;
pub use sqlite::SqliteSubscriberStore;
pub use types::{Subscriber, Subscription};
pub(crate) use types::series_key;

use crate::episode::Quality;
use crate::error::StoreError;

/// Trait for subscriber storage backends.
pub trait SubscriberStore: Send + Sync {
    /// Get a subscriber with its subscriptions.
    fn get(&self, id: &str) -> Result<Option<Subscriber>, StoreError>;

    /// List all subscribers.
    fn list(&self) -> Result<Vec<Subscriber>, StoreError>;

    /// Create or replace a subscriber together with its subscriptions.
    fn save(&self, subscriber: &Subscriber) -> Result<(), StoreError>;

    /// Delete a subscriber and its subscriptions. Returns whether it existed.
    fn delete(&self, id: &str) -> Result<bool, StoreError>;

    /// Follow a series in one quality, replacing any previous tier for it.
    fn set_subscription(
        &self,
        subscriber_id: &str,
        series_name: &str,
        quality: Quality,
    ) -> Result<(), StoreError>;

    /// Stop following a series. Returns whether a subscription was removed.
    fn remove_subscription(&self, subscriber_id: &str, series_name: &str)
        -> Result<bool, StoreError>;

    /// Ids of subscribers following `series_name` (case-insensitive) in `quality`.
    fn find_subscribers(&self, series_name: &str, quality: Quality)
        -> Result<Vec<String>, StoreError>;
}
