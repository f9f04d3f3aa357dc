//! Canonical descriptor download from the upstream tracker.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use thiserror::Error;
use tracing::debug;

use crate::config::UpstreamConfig;

/// Errors from downloading a descriptor.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request timed out")]
    Timeout,

    #[error("Upstream returned HTTP {status} for release {tracker_id}")]
    HttpStatus { tracker_id: String, status: u16 },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Upstream error: {0}")]
    Upstream(String),
}

/// Source of canonical descriptors, keyed by tracker id.
#[async_trait]
pub trait DescriptorFetcher: Send + Sync {
    async fn fetch(&self, tracker_id: &str) -> Result<Vec<u8>, FetchError>;
}

/// Downloads descriptors over HTTP using the configured URL template.
pub struct HttpDescriptorFetcher {
    client: Client,
    url_template: String,
}

impl HttpDescriptorFetcher {
    pub fn new(config: &UpstreamConfig) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        if let Some(cookie) = config.cookie.as_deref().filter(|c| !c.is_empty()) {
            let value = header::HeaderValue::from_str(cookie)
                .map_err(|e| FetchError::Client(format!("invalid cookie: {}", e)))?;
            headers.insert(header::COOKIE, value);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .default_headers(headers)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            url_template: config.descriptor_url.clone(),
        })
    }

    fn url_for(&self, tracker_id: &str) -> String {
        self.url_template
            .replace("{id}", &urlencoding::encode(tracker_id))
    }
}

#[async_trait]
impl DescriptorFetcher for HttpDescriptorFetcher {
    async fn fetch(&self, tracker_id: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(tracker_id);
        debug!(tracker_id, "Downloading canonical descriptor");

        let response = self.client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else if e.is_connect() {
                FetchError::ConnectionFailed(e.to_string())
            } else {
                FetchError::Upstream(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                tracker_id: tracker_id.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Upstream(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> UpstreamConfig {
        UpstreamConfig {
            feed_url: "https://tracker.example/rss.xml".to_string(),
            descriptor_url: "https://tracker.example/download.php?id={id}".to_string(),
            cookie: Some("uid=1; pass=abc".to_string()),
            timeout_secs: 5,
        }
    }

    #[test]
    fn test_url_for_substitutes_id() {
        let fetcher = HttpDescriptorFetcher::new(&config()).unwrap();
        assert_eq!(
            fetcher.url_for("51234"),
            "https://tracker.example/download.php?id=51234"
        );
        assert_eq!(
            fetcher.url_for("a&b"),
            "https://tracker.example/download.php?id=a%26b"
        );
    }

    #[test]
    fn test_invalid_cookie_is_rejected() {
        let mut config = config();
        config.cookie = Some("bad\nvalue".to_string());
        assert!(matches!(
            HttpDescriptorFetcher::new(&config),
            Err(FetchError::Client(_))
        ));
    }
}
