//! Mock descriptor download for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent::{DescriptorFetcher, FetchError};

/// Mock implementation of the DescriptorFetcher trait.
///
/// Provides controllable behavior for testing:
/// - Serve registered descriptor bytes by tracker id
/// - Fail selected tracker ids with an upstream HTTP error
/// - Record every requested id
///
/// Unknown ids answer HTTP 404.
#[derive(Debug, Default)]
pub struct MockDescriptorFetcher {
    descriptors: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    failing: Arc<RwLock<HashSet<String>>>,
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockDescriptorFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `bytes` for `tracker_id`.
    pub async fn add_descriptor(&self, tracker_id: impl Into<String>, bytes: Vec<u8>) {
        self.descriptors
            .write()
            .await
            .insert(tracker_id.into(), bytes);
    }

    /// Make downloads of `tracker_id` fail (or succeed again).
    pub async fn set_failing(&self, tracker_id: &str, failing: bool) {
        let mut set = self.failing.write().await;
        if failing {
            set.insert(tracker_id.to_string());
        } else {
            set.remove(tracker_id);
        }
    }

    /// Tracker ids requested so far, in call order.
    pub async fn recorded_calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl DescriptorFetcher for MockDescriptorFetcher {
    async fn fetch(&self, tracker_id: &str) -> Result<Vec<u8>, FetchError> {
        self.calls.write().await.push(tracker_id.to_string());

        if self.failing.read().await.contains(tracker_id) {
            return Err(FetchError::HttpStatus {
                tracker_id: tracker_id.to_string(),
                status: 503,
            });
        }

        self.descriptors
            .read()
            .await
            .get(tracker_id)
            .cloned()
            .ok_or_else(|| FetchError::HttpStatus {
                tracker_id: tracker_id.to_string(),
                status: 404,
            })
    }
}
