//! Mock upstream feed for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::feed::{FeedError, FeedItem, FeedSource};

/// Mock implementation of the FeedSource trait.
///
/// Serves a configurable item list and counts polls.
///
/// # Example
///
/// ```rust,ignore
/// use episodecast_core::testing::MockFeedSource;
///
/// let source = MockFeedSource::new();
/// source.set_items(vec![fixtures::feed_item("...", 1, 0)]).await;
/// source.fail_next(FeedError::Timeout).await;
/// ```
#[derive(Debug, Default)]
pub struct MockFeedSource {
    items: Arc<RwLock<Vec<FeedItem>>>,
    next_error: Arc<RwLock<Option<FeedError>>>,
    fetch_count: Arc<RwLock<usize>>,
}

impl MockFeedSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the items served by subsequent polls.
    pub async fn set_items(&self, items: Vec<FeedItem>) {
        *self.items.write().await = items;
    }

    /// Make the next poll fail with `error`.
    pub async fn fail_next(&self, error: FeedError) {
        *self.next_error.write().await = Some(error);
    }

    /// Number of polls so far, failed ones included.
    pub async fn fetch_count(&self) -> usize {
        *self.fetch_count.read().await
    }
}

#[async_trait]
impl FeedSource for MockFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        *self.fetch_count.write().await += 1;
        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }
        Ok(self.items.read().await.clone())
    }
}
