//! Descriptor inspection - validates .torrent data and reads its identity.
//!
//! Uses librqbit-core so a downloaded canonical descriptor is checked with a
//! real metainfo parser before it is cached (upstream answers a failed
//! session with an HTML page, not an error status).

use librqbit_core::torrent_metainfo::{torrent_from_bytes, TorrentMetaV1Owned};
use thiserror::Error;

/// Errors that can occur when inspecting descriptors.
#[derive(Debug, Error)]
pub enum InspectError {
    #[error("Failed to parse torrent: {0}")]
    ParseError(String),

    #[error("Empty torrent (no files)")]
    EmptyTorrent,
}

/// Identity of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorInfo {
    /// Lowercase hex info hash.
    pub info_hash: String,
    /// Root name (file name for single-file, folder for multi-file).
    pub name: Option<String>,
    /// Total payload size in bytes.
    pub total_size: u64,
}

/// Parse a .torrent file and read its info hash, name and payload size.
pub fn inspect_descriptor(bytes: &[u8]) -> Result<DescriptorInfo, InspectError> {
    let torrent: TorrentMetaV1Owned =
        torrent_from_bytes(bytes).map_err(|e| InspectError::ParseError(e.to_string()))?;

    let info = &torrent.info;

    let name = info
        .name
        .as_ref()
        .map(|b| String::from_utf8_lossy(b.as_ref()).into_owned());

    let total_size = if let Some(ref files) = info.files {
        if files.is_empty() {
            return Err(InspectError::EmptyTorrent);
        }
        files.iter().map(|f| f.length).sum()
    } else if let Some(length) = info.length {
        length
    } else {
        return Err(InspectError::EmptyTorrent);
    };

    Ok(DescriptorInfo {
        info_hash: torrent.info_hash.as_string(),
        name,
        total_size,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_inspect_invalid_torrent() {
        assert!(inspect_descriptor(b"not a valid torrent").is_err());
        assert!(inspect_descriptor(b"").is_err());
    }

    #[test]
    fn test_inspect_fixture() {
        let bytes = fixtures::torrent_bytes("Show.S01E01.mkv");
        let info = inspect_descriptor(&bytes).unwrap();
        assert_eq!(info.name.as_deref(), Some("Show.S01E01.mkv"));
        assert_eq!(info.total_size, fixtures::FIXTURE_LENGTH as u64);
        assert_eq!(info.info_hash.len(), 40);
    }

    #[test]
    fn test_info_hash_depends_on_name() {
        let a = inspect_descriptor(&fixtures::torrent_bytes("a.mkv")).unwrap();
        let b = inspect_descriptor(&fixtures::torrent_bytes("b.mkv")).unwrap();
        assert_ne!(a.info_hash, b.info_hash);
    }
}
