//! Feed synchronization and per-subscriber torrent distribution.

pub mod config;
pub mod episode;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod series;
pub mod subscriber;
pub mod sync;
pub mod testing;
pub mod torrent;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use episode::{parse_title, ParsedEpisode, Quality, TitleParse};
pub use error::StoreError;
pub use feed::{
    render_rss, CleanupOutcome, FeedError, FeedItem, FeedSource, HttpFeedSource, Snapshot,
    SnapshotStore, SqliteSnapshotStore, SqliteSubscriberFeedStore, SubscriberFeedItem,
    SubscriberFeedMaintainer, SubscriberFeedStore,
};
pub use series::{SeriesCatalog, SeriesStore, SeriesUpdate, SqliteSeriesStore};
pub use subscriber::{
    SqliteSubscriberStore, Subscriber, SubscriberRegistry, SubscriberStore, Subscription,
};
pub use sync::{CycleReport, FeedSyncEngine, SyncComponents, SyncConfig, SyncError, SyncScheduler};
pub use torrent::{
    DescriptorFetcher, DescriptorStore, FsDescriptorStore, HttpDescriptorFetcher,
    TorrentPersonalizer,
};
