//! Subscriber sign-up and subscription edits.
//!
//! Edits go through here rather than straight to the [`SubscriberStore`] so a
//! subscriber's feed and personalized descriptors follow what they still
//! subscribe to.

use std::sync::Arc;

use tracing::{info, warn};

use super::{Subscriber, SubscriberStore};
use crate::episode::Quality;
use crate::error::StoreError;
use crate::feed::{CleanupOutcome, SubscriberFeedMaintainer};

pub struct SubscriberRegistry {
    store: Arc<dyn SubscriberStore>,
    feeds: Arc<SubscriberFeedMaintainer>,
}

impl SubscriberRegistry {
    pub fn new(store: Arc<dyn SubscriberStore>, feeds: Arc<SubscriberFeedMaintainer>) -> Self {
        Self { store, feeds }
    }

    pub fn get(&self, id: &str) -> Result<Option<Subscriber>, StoreError> {
        self.store.get(id)
    }

    /// Create a subscriber, or change the tracking token of an existing one.
    /// Existing subscriptions are kept.
    pub fn register(&self, id: &str, tracking_token: &str) -> Result<Subscriber, StoreError> {
        let subscriber = match self.store.get(id)? {
            Some(mut existing) => {
                existing.tracking_token = tracking_token.to_string();
                existing
            }
            None => Subscriber::new(id, tracking_token),
        };
        self.store.save(&subscriber)?;

        info!(subscriber_id = id, "Subscriber registered");
        Ok(subscriber)
    }

    /// Follow `series_name` in `quality`, replacing the tier if the series
    /// was already followed. Fails with `NotFound` for an unknown subscriber.
    pub fn subscribe(
        &self,
        id: &str,
        series_name: &str,
        quality: Quality,
    ) -> Result<Subscriber, StoreError> {
        self.store.set_subscription(id, series_name, quality)?;
        info!(subscriber_id = id, series = series_name, quality = %quality, "Subscription set");

        self.store
            .get(id)?
            .ok_or_else(|| StoreError::NotFound(format!("subscriber {}", id)))
    }

    /// Stop following a series and drop its entries from the subscriber's
    /// feed. Returns whether a subscription was removed.
    pub async fn unsubscribe(&self, id: &str, series_name: &str) -> Result<bool, StoreError> {
        if !self.store.remove_subscription(id, series_name)? {
            return Ok(false);
        }

        let cleanup = self.feeds.remove_series(id, series_name).await?;
        log_cleanup(id, &cleanup);
        info!(subscriber_id = id, series = series_name, "Subscription removed");
        Ok(true)
    }

    /// Delete a subscriber with its feed and personalized descriptors.
    /// Returns whether the subscriber existed.
    pub async fn unregister(&self, id: &str) -> Result<bool, StoreError> {
        if !self.store.delete(id)? {
            return Ok(false);
        }

        let cleanup = self.feeds.purge(id).await?;
        log_cleanup(id, &cleanup);
        info!(subscriber_id = id, "Subscriber removed");
        Ok(true)
    }
}

fn log_cleanup(subscriber_id: &str, cleanup: &CleanupOutcome) {
    if !cleanup.is_clean() {
        warn!(
            subscriber_id,
            failed = cleanup.failed.len(),
            "Some descriptors could not be removed"
        );
    }
}
