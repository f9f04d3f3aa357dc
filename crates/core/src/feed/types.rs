//! Feed item types shared by the upstream snapshot and subscriber feeds.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from fetching or decoding a feed document.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed request failed: {0}")]
    Request(String),

    #[error("Feed request timed out")]
    Timeout,

    #[error("Feed returned HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}

/// Order two entries newest first, ties broken by case-insensitive title.
fn newest_first(
    a_at: &DateTime<Utc>,
    a_title: &str,
    b_at: &DateTime<Utc>,
    b_title: &str,
) -> Ordering {
    b_at.cmp(a_at)
        .then_with(|| a_title.to_lowercase().cmp(&b_title.to_lowercase()))
}

/// A release announced by the upstream feed.
///
/// Equality is the (title, link, published_at) tuple; parsed fields never
/// take part in change detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    /// Raw release title.
    pub title: String,
    /// Release download link; carries the tracker id in its `id` parameter.
    pub link: String,
    pub published_at: DateTime<Utc>,
}

impl FeedItem {
    pub fn new(
        title: impl Into<String>,
        link: impl Into<String>,
        published_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            published_at,
        }
    }

    /// Tracker id of the release, taken from the link's `id` query parameter.
    pub fn tracker_id(&self) -> Option<String> {
        let url = url::Url::parse(&self.link).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "id")
            .map(|(_, value)| value.into_owned())
            .filter(|id| !id.is_empty())
    }

    /// Snapshot ordering: newest first, then case-insensitive title.
    pub fn feed_order(&self, other: &Self) -> Ordering {
        newest_first(
            &self.published_at,
            &self.title,
            &other.published_at,
            &other.title,
        )
    }
}

/// Ordered set of upstream items as seen by one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    items: Vec<FeedItem>,
}

impl Snapshot {
    /// Build a snapshot, ordering items and dropping exact duplicates.
    pub fn from_items(mut items: Vec<FeedItem>) -> Self {
        items.sort_by(FeedItem::feed_order);
        items.dedup();
        Self { items }
    }

    pub fn items(&self) -> &[FeedItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Whether this snapshot differs from `previous`: different sizes, or any
    /// positional item differs by (title, link, published_at).
    pub fn has_updates_since(&self, previous: &Snapshot) -> bool {
        if self.items.len() != previous.items.len() {
            return true;
        }
        self.items
            .iter()
            .zip(previous.items.iter())
            .any(|(current, old)| current != old)
    }

    pub fn into_items(self) -> Vec<FeedItem> {
        self.items
    }
}

/// An entry of a subscriber's personal feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberFeedItem {
    /// Display name of the personalized descriptor.
    pub title: String,
    /// Download URL of the personalized descriptor.
    pub link: String,
    pub published_at: DateTime<Utc>,
    /// File name the descriptor store reported when saving the descriptor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    /// Series the release belongs to, `"<local> (<foreign>)"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
}

impl SubscriberFeedItem {
    /// File name of the personalized descriptor backing this entry: the
    /// stored name when known, else the one derived from the title.
    pub fn file_name(&self) -> String {
        self.descriptor
            .clone()
            .unwrap_or_else(|| descriptor_file_name(&self.title))
    }

    pub fn feed_order(&self, other: &Self) -> Ordering {
        newest_first(
            &self.published_at,
            &self.title,
            &other.published_at,
            &other.title,
        )
    }

    pub fn same_title(&self, other: &Self) -> bool {
        self.title.to_lowercase() == other.title.to_lowercase()
    }
}

/// `<display-name>.torrent`
pub fn descriptor_file_name(display_name: &str) -> String {
    format!("{}.torrent", display_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_tracker_id_from_link() {
        let item = FeedItem::new(
            "x",
            "https://tracker.example/rssdownloader.php?id=51234&type=1",
            at(1),
        );
        assert_eq!(item.tracker_id().as_deref(), Some("51234"));

        let item = FeedItem::new("x", "https://tracker.example/series/flash", at(1));
        assert!(item.tracker_id().is_none());

        let item = FeedItem::new("x", "not a url", at(1));
        assert!(item.tracker_id().is_none());
    }

    #[test]
    fn test_snapshot_orders_newest_first_then_title() {
        let snapshot = Snapshot::from_items(vec![
            FeedItem::new("b", "l1", at(1)),
            FeedItem::new("C", "l2", at(2)),
            FeedItem::new("a", "l3", at(2)),
        ]);
        let titles: Vec<_> = snapshot.items().iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "C", "b"]);
    }

    #[test]
    fn test_snapshot_drops_exact_duplicates() {
        let snapshot = Snapshot::from_items(vec![
            FeedItem::new("a", "l1", at(1)),
            FeedItem::new("a", "l1", at(1)),
        ]);
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_has_updates_since() {
        let old = Snapshot::from_items(vec![
            FeedItem::new("a", "l1", at(1)),
            FeedItem::new("b", "l2", at(2)),
        ]);
        let same = Snapshot::from_items(vec![
            FeedItem::new("b", "l2", at(2)),
            FeedItem::new("a", "l1", at(1)),
        ]);
        assert!(!same.has_updates_since(&old));

        let relinked = Snapshot::from_items(vec![
            FeedItem::new("a", "l1-new", at(1)),
            FeedItem::new("b", "l2", at(2)),
        ]);
        assert!(relinked.has_updates_since(&old));

        let grown = Snapshot::from_items(vec![
            FeedItem::new("a", "l1", at(1)),
            FeedItem::new("b", "l2", at(2)),
            FeedItem::new("c", "l3", at(3)),
        ]);
        assert!(grown.has_updates_since(&old));
        assert!(old.has_updates_since(&Snapshot::default()));
    }

    #[test]
    fn test_subscriber_item_same_title_is_case_insensitive() {
        let a = SubscriberFeedItem {
            title: "The.Flash.S08E13.1080p".to_string(),
            link: "l".to_string(),
            published_at: at(1),
            descriptor: None,
            series: None,
        };
        let b = SubscriberFeedItem {
            title: "the.flash.s08e13.1080P".to_string(),
            link: "other".to_string(),
            published_at: at(2),
            descriptor: Some("the.flash.s08e13.1080P.torrent".to_string()),
            series: None,
        };
        assert!(a.same_title(&b));
        assert_eq!(a.file_name(), "The.Flash.S08E13.1080p.torrent");
        assert_eq!(b.file_name(), "the.flash.s08e13.1080P.torrent");
    }
}
