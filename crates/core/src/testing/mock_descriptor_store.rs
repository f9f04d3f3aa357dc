//! In-memory descriptor store for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::feed::descriptor_file_name;
use crate::torrent::DescriptorStore;

/// Mock implementation of the DescriptorStore trait.
///
/// Keeps descriptors in memory and records deletions. Deletions and
/// personalized saves can be told to fail.
#[derive(Debug, Default)]
pub struct MockDescriptorStore {
    canonical: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    user: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
    deletes: Arc<RwLock<Vec<(String, String)>>>,
    fail_deletes: Arc<RwLock<bool>>,
    fail_user_saves: Arc<RwLock<bool>>,
}

impl MockDescriptorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every deletion fail with `StoreError::Unavailable`.
    pub async fn set_fail_deletes(&self, fail: bool) {
        *self.fail_deletes.write().await = fail;
    }

    /// Make every personalized save fail with `StoreError::Unavailable`.
    pub async fn set_fail_user_saves(&self, fail: bool) {
        *self.fail_user_saves.write().await = fail;
    }

    /// Successful deletions as (subscriber id, file name).
    pub async fn recorded_deletes(&self) -> Vec<(String, String)> {
        self.deletes.read().await.clone()
    }

    /// Stored personalized descriptor, if any.
    pub async fn user_descriptor(&self, subscriber_id: &str, file_name: &str) -> Option<Vec<u8>> {
        self.user
            .read()
            .await
            .get(&(subscriber_id.to_string(), file_name.to_string()))
            .cloned()
    }

    /// File names stored for a subscriber, sorted.
    pub async fn user_files(&self, subscriber_id: &str) -> Vec<String> {
        let mut files: Vec<String> = self
            .user
            .read()
            .await
            .keys()
            .filter(|(sub, _)| sub == subscriber_id)
            .map(|(_, file)| file.clone())
            .collect();
        files.sort();
        files
    }

    pub async fn canonical_count(&self) -> usize {
        self.canonical.read().await.len()
    }
}

#[async_trait]
impl DescriptorStore for MockDescriptorStore {
    async fn load_canonical(&self, tracker_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.canonical.read().await.get(tracker_id).cloned())
    }

    async fn save_canonical(&self, tracker_id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        self.canonical
            .write()
            .await
            .insert(tracker_id.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn save_user_descriptor(
        &self,
        subscriber_id: &str,
        display_name: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        if *self.fail_user_saves.read().await {
            return Err(StoreError::Unavailable("mock save failure".to_string()));
        }

        let file_name = descriptor_file_name(display_name);
        self.user
            .write()
            .await
            .insert((subscriber_id.to_string(), file_name.clone()), bytes.to_vec());
        Ok(file_name)
    }

    async fn load_user_descriptor(
        &self,
        subscriber_id: &str,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.user_descriptor(subscriber_id, file_name).await)
    }

    async fn delete_user_descriptor(
        &self,
        subscriber_id: &str,
        file_name: &str,
    ) -> Result<(), StoreError> {
        if *self.fail_deletes.read().await {
            return Err(StoreError::Unavailable("mock delete failure".to_string()));
        }

        self.user
            .write()
            .await
            .remove(&(subscriber_id.to_string(), file_name.to_string()));
        self.deletes
            .write()
            .await
            .push((subscriber_id.to_string(), file_name.to_string()));
        Ok(())
    }
}
