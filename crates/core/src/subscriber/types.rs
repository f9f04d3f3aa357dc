use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::episode::Quality;

/// A series a subscriber follows, in one quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub series_name: String,
    pub quality: Quality,
}

impl Subscription {
    pub fn new(series_name: impl Into<String>, quality: Quality) -> Self {
        Self {
            series_name: series_name.into(),
            quality,
        }
    }

    /// Whether this subscription covers a release of `series_name` in `quality`.
    pub fn matches(&self, series_name: &str, quality: Quality) -> bool {
        self.quality == quality && series_key(&self.series_name) == series_key(series_name)
    }
}

/// A feed subscriber with a tracker token and a set of subscriptions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: String,
    /// Token embedded in the subscriber's announce URLs.
    pub tracking_token: String,
    pub subscriptions: Vec<Subscription>,
    pub created_at: DateTime<Utc>,
}

impl Subscriber {
    pub fn new(id: impl Into<String>, tracking_token: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tracking_token: tracking_token.into(),
            subscriptions: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Follow `series_name` in `quality`, replacing any other tier already
    /// selected for that series.
    pub fn subscribe(&mut self, series_name: impl Into<String>, quality: Quality) {
        let series_name = series_name.into();
        let key = series_key(&series_name);
        self.subscriptions
            .retain(|s| series_key(&s.series_name) != key);
        self.subscriptions
            .push(Subscription::new(series_name, quality));
    }

    /// Stop following `series_name`. Returns whether a subscription was removed.
    pub fn unsubscribe(&mut self, series_name: &str) -> bool {
        let key = series_key(series_name);
        let before = self.subscriptions.len();
        self.subscriptions
            .retain(|s| series_key(&s.series_name) != key);
        self.subscriptions.len() != before
    }

    /// Selected tier for `series_name`, if subscribed.
    pub fn quality_for(&self, series_name: &str) -> Option<Quality> {
        let key = series_key(series_name);
        self.subscriptions
            .iter()
            .find(|s| series_key(&s.series_name) == key)
            .map(|s| s.quality)
    }
}

/// Case-insensitive (Unicode) comparison key for series names.
pub(crate) fn series_key(series_name: &str) -> String {
    series_name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subscribe_replaces_quality() {
        let mut sub = Subscriber::new("42", "token");
        sub.subscribe("Флэш (The Flash)", Quality::Sd);
        sub.subscribe("ФЛЭШ (the flash)", Quality::FullHd);

        assert_eq!(sub.subscriptions.len(), 1);
        assert_eq!(sub.quality_for("флэш (The Flash)"), Some(Quality::FullHd));
    }

    #[test]
    fn test_unsubscribe() {
        let mut sub = Subscriber::new("42", "token");
        sub.subscribe("Флэш (The Flash)", Quality::Mp4);
        sub.subscribe("Люцифер (Lucifer)", Quality::Sd);

        assert!(sub.unsubscribe("флэш (the flash)"));
        assert!(!sub.unsubscribe("флэш (the flash)"));
        assert_eq!(sub.subscriptions.len(), 1);
        assert!(sub.quality_for("Флэш (The Flash)").is_none());
    }

    #[test]
    fn test_subscription_matches() {
        let s = Subscription::new("Флэш (The Flash)", Quality::Mp4);
        assert!(s.matches("ФЛЭШ (THE FLASH)", Quality::Mp4));
        assert!(!s.matches("Флэш (The Flash)", Quality::FullHd));
        assert!(!s.matches("Стрела (Arrow)", Quality::Mp4));
    }
}
