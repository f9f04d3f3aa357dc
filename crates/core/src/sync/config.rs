//! Sync scheduler configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the feed sync engine and its scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Run cycles on a timer. When disabled, cycles only run via the API.
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between the start of two scheduled cycles.
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Maximum number of items kept in each subscriber feed.
    #[serde(default = "default_feed_limit")]
    pub feed_limit: usize,

    /// Upstream items processed concurrently within one cycle.
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
}

fn default_interval() -> u64 {
    300 // 5 minutes
}

fn default_feed_limit() -> usize {
    15
}

fn default_max_concurrent_items() -> usize {
    4
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval(),
            feed_limit: default_feed_limit(),
            max_concurrent_items: default_max_concurrent_items(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SyncConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.feed_limit, 15);
        assert_eq!(config.max_concurrent_items, 4);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SyncConfig = toml::from_str("enabled = true").unwrap();
        assert!(config.enabled);
        assert_eq!(config.interval_secs, 300);
        assert_eq!(config.feed_limit, 15);
    }
}
