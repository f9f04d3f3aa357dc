//! Upstream feed polling, snapshots and per-subscriber feeds.

mod rss;
mod snapshot;
mod source;
mod subscriber_feed;
mod types;

pub use rss::{parse_rss, render_rss};
pub use snapshot::{SnapshotStore, SqliteSnapshotStore};
pub use source::{FeedSource, HttpFeedSource};
pub use subscriber_feed::{
    AppendResult, CleanupOutcome, SqliteSubscriberFeedStore, SubscriberFeedMaintainer,
    SubscriberFeedStore,
};
pub use types::{descriptor_file_name, FeedError, FeedItem, Snapshot, SubscriberFeedItem};
