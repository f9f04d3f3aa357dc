//! Descriptor storage trait and the filesystem implementation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;

use crate::error::StoreError;
use crate::feed::descriptor_file_name;

/// Storage for canonical descriptors (keyed by tracker id) and personalized
/// descriptors (keyed by subscriber id and file name).
#[async_trait]
pub trait DescriptorStore: Send + Sync {
    /// Cached canonical descriptor, `None` if not fetched yet.
    async fn load_canonical(&self, tracker_id: &str) -> Result<Option<Vec<u8>>, StoreError>;

    async fn save_canonical(&self, tracker_id: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Store a personalized descriptor as `<display-name>.torrent`.
    /// Returns the file name it was stored under.
    async fn save_user_descriptor(
        &self,
        subscriber_id: &str,
        display_name: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError>;

    async fn load_user_descriptor(
        &self,
        subscriber_id: &str,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, StoreError>;

    /// Delete a personalized descriptor. Deleting a missing file is not an error.
    async fn delete_user_descriptor(
        &self,
        subscriber_id: &str,
        file_name: &str,
    ) -> Result<(), StoreError>;
}

/// Filesystem layout:
///
/// ```text
/// <root>/canonical/<tracker-id>.torrent
/// <root>/users/<subscriber-id>/<display-name>.torrent
/// ```
pub struct FsDescriptorStore {
    root: PathBuf,
}

impl FsDescriptorStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn canonical_path(&self, tracker_id: &str) -> PathBuf {
        self.root
            .join("canonical")
            .join(descriptor_file_name(&sanitize_component(tracker_id)))
    }

    fn user_dir(&self, subscriber_id: &str) -> PathBuf {
        self.root.join("users").join(sanitize_component(subscriber_id))
    }

    fn user_path(&self, subscriber_id: &str, file_name: &str) -> PathBuf {
        self.user_dir(subscriber_id).join(sanitize_component(file_name))
    }

    /// Write via a temporary file and rename, so readers never see a partial file.
    async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("part");
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }

    async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl DescriptorStore for FsDescriptorStore {
    async fn load_canonical(&self, tracker_id: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read_optional(&self.canonical_path(tracker_id)).await
    }

    async fn save_canonical(&self, tracker_id: &str, bytes: &[u8]) -> Result<(), StoreError> {
        Self::write_atomic(&self.canonical_path(tracker_id), bytes).await
    }

    async fn save_user_descriptor(
        &self,
        subscriber_id: &str,
        display_name: &str,
        bytes: &[u8],
    ) -> Result<String, StoreError> {
        let file_name = sanitize_component(&descriptor_file_name(display_name));
        Self::write_atomic(&self.user_path(subscriber_id, &file_name), bytes).await?;
        Ok(file_name)
    }

    async fn load_user_descriptor(
        &self,
        subscriber_id: &str,
        file_name: &str,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read_optional(&self.user_path(subscriber_id, file_name)).await
    }

    async fn delete_user_descriptor(
        &self,
        subscriber_id: &str,
        file_name: &str,
    ) -> Result<(), StoreError> {
        match fs::remove_file(self.user_path(subscriber_id, file_name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Make a string safe to use as a single path component.
fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    match cleaned.trim() {
        "" | "." | ".." => "_".to_string(),
        trimmed => trimmed.to_string(),
    }
}
