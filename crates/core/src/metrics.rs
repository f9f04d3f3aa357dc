//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Sync cycles (results, duration)
//! - Upstream items by outcome
//! - Subscriber deliveries and feed maintenance

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Sync Cycle Metrics
// =============================================================================

/// Sync cycles total by result.
pub static CYCLES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("episodecast_sync_cycles_total", "Total sync cycles"),
        &["result"], // "unchanged", "success", "partial_failure", "failed"
    )
    .unwrap()
});

/// Sync cycle duration in seconds.
pub static CYCLE_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "episodecast_sync_cycle_duration_seconds",
            "Duration of a sync cycle",
        )
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
    )
    .unwrap()
});

/// Upstream items processed by outcome.
pub static ITEMS_PROCESSED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "episodecast_items_processed_total",
            "Upstream feed items processed",
        ),
        &["outcome"], // "unparseable", "season_pack", "skipped", "published", "failed"
    )
    .unwrap()
});

// =============================================================================
// Delivery Metrics
// =============================================================================

/// Personalized descriptor deliveries by result.
pub static DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "episodecast_deliveries_total",
            "Personalized descriptors delivered to subscribers",
        ),
        &["result"], // "delivered", "failed"
    )
    .unwrap()
});

/// Items evicted from subscriber feeds.
pub static FEED_EVICTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "episodecast_feed_evictions_total",
        "Items evicted from subscriber feeds",
    )
    .unwrap()
});

/// Evicted descriptors that could not be deleted.
pub static CLEANUP_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "episodecast_cleanup_failures_total",
        "Evicted descriptors that could not be deleted",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(CYCLES.clone()),
        Box::new(CYCLE_DURATION.clone()),
        Box::new(ITEMS_PROCESSED.clone()),
        Box::new(DELIVERIES.clone()),
        Box::new(FEED_EVICTIONS.clone()),
        Box::new(CLEANUP_FAILURES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
        CYCLES.with_label_values(&["success"]).inc();
        assert!(registry
            .gather()
            .iter()
            .any(|f| f.get_name() == "episodecast_sync_cycles_total"));
    }
}
