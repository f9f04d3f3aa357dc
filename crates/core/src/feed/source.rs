//! Upstream feed polling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use super::rss::parse_rss;
use super::types::{FeedError, FeedItem};
use crate::config::UpstreamConfig;

/// Source of the upstream release list.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Fetch the current items, in document order.
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError>;
}

/// Polls the upstream RSS document over HTTP.
pub struct HttpFeedSource {
    client: Client,
    feed_url: String,
}

impl HttpFeedSource {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| FeedError::Request(e.to_string()))?;

        Ok(Self {
            client,
            feed_url: config.feed_url.clone(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch(&self) -> Result<Vec<FeedItem>, FeedError> {
        debug!(url = %self.feed_url, "Polling upstream feed");

        let response = self.client.get(&self.feed_url).send().await.map_err(|e| {
            if e.is_timeout() {
                FeedError::Timeout
            } else {
                FeedError::Request(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FeedError::Request(e.to_string()))?;
        let items = parse_rss(&body)?;
        debug!(count = items.len(), "Upstream feed parsed");
        Ok(items)
    }
}
