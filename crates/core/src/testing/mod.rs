//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the upstream-facing traits
//! and the descriptor store, so sync cycles can be tested end to end against
//! in-memory SQLite stores.
//!
//! # Example
//!
//! ```rust,ignore
//! use episodecast_core::testing::{fixtures, MockDescriptorFetcher, MockFeedSource};
//!
//! let source = MockFeedSource::new();
//! source.set_items(vec![fixtures::feed_item(TITLE, 51234, 0)]).await;
//!
//! let fetcher = MockDescriptorFetcher::new();
//! fetcher.add_descriptor("51234", fixtures::torrent_bytes("The.Flash.S08E13.mkv")).await;
//! ```

mod mock_descriptor_fetcher;
mod mock_descriptor_store;
mod mock_feed_source;

pub use mock_descriptor_fetcher::MockDescriptorFetcher;
pub use mock_descriptor_store::MockDescriptorStore;
pub use mock_feed_source::MockFeedSource;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;

    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_bencode::value::Value;

    use crate::feed::FeedItem;

    /// Payload length of fixture descriptors.
    pub const FIXTURE_LENGTH: i64 = 1000;

    /// Tracker announced by fixture descriptors before personalization.
    pub const UPSTREAM_ANNOUNCE: &str = "http://upstream.example/announce";

    fn bytes(s: &str) -> Value {
        Value::Bytes(s.as_bytes().to_vec())
    }

    fn descriptor(name: Option<&str>) -> Vec<u8> {
        let mut info = HashMap::new();
        info.insert(b"length".to_vec(), Value::Int(FIXTURE_LENGTH));
        info.insert(b"piece length".to_vec(), Value::Int(16384));
        // One piece; the hash only needs the right size.
        let seed = name
            .unwrap_or("")
            .bytes()
            .fold(7u8, |acc, b| acc.wrapping_mul(31).wrapping_add(b));
        info.insert(b"pieces".to_vec(), Value::Bytes(vec![seed; 20]));
        if let Some(name) = name {
            info.insert(b"name".to_vec(), bytes(name));
        }

        let mut root = HashMap::new();
        root.insert(b"announce".to_vec(), bytes(UPSTREAM_ANNOUNCE));
        root.insert(b"info".to_vec(), Value::Dict(info));

        serde_bencode::to_bytes(&Value::Dict(root)).expect("fixture descriptor encodes")
    }

    /// Bencoded single-file descriptor named `name`.
    pub fn torrent_bytes(name: &str) -> Vec<u8> {
        descriptor(Some(name))
    }

    /// Bencoded descriptor whose info dictionary has no name.
    pub fn torrent_bytes_without_name() -> Vec<u8> {
        descriptor(None)
    }

    /// Base publication time of fixture feed items.
    pub fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2022, 3, 10, 12, 0, 0).unwrap()
    }

    /// Upstream release link carrying `tracker_id`.
    pub fn release_link(tracker_id: u32) -> String {
        format!("https://tracker.example/rssdownloader.php?id={}", tracker_id)
    }

    /// Upstream feed item published `hour` hours after [`base_time`].
    pub fn feed_item(title: &str, tracker_id: u32, hour: i64) -> FeedItem {
        FeedItem::new(
            title,
            release_link(tracker_id),
            base_time() + Duration::hours(hour),
        )
    }
}
