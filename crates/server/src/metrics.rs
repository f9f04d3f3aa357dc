//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the episodecast server:
//! - HTTP request metrics (latency, counts)
//! - Sync scheduler, catalog and subscriber gauges (collected dynamically)
//! - Core sync metrics, registered from `episodecast_core::metrics`

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "episodecast_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("episodecast_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "episodecast_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Sync Metrics (collected dynamically)
// =============================================================================

/// Sync scheduler running state (1 = running, 0 = stopped).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "episodecast_sync_scheduler_running",
        "Whether the sync scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

/// Series known to the catalog.
pub static SERIES_TRACKED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "episodecast_series_tracked",
        "Number of series in the catalog",
    )
    .unwrap()
});

/// Registered subscribers.
pub static SUBSCRIBERS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new("episodecast_subscribers", "Number of registered subscribers").unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Sync
    registry
        .register(Box::new(SCHEDULER_RUNNING.clone()))
        .unwrap();
    registry.register(Box::new(SERIES_TRACKED.clone())).unwrap();
    registry.register(Box::new(SUBSCRIBERS.clone())).unwrap();

    // Core metrics (cycles, items, deliveries, feed maintenance)
    for metric in episodecast_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Collect dynamic metrics from current application state.
///
/// Called before encoding so gauges reflect the current scheduler, catalog
/// and subscriber registry.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let running = state.scheduler().is_some_and(|s| s.is_running());
    SCHEDULER_RUNNING.set(if running { 1 } else { 0 });

    SERIES_TRACKED.set(state.catalog().len().await as i64);

    if let Ok(subscribers) = state.subscribers().list() {
        SUBSCRIBERS.set(subscribers.len() as i64);
    }
}

/// Normalize a path for metric labels (replace subscriber ids and file names
/// with placeholders).
pub fn normalize_path(path: &str) -> String {
    static TORRENT_PATH: Lazy<regex_lite::Regex> = Lazy::new(|| {
        regex_lite::Regex::new(r"/torrents/[^/]+/[^/]+$").unwrap()
    });
    static FEED_PATH: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/feeds/[^/]+$").unwrap());
    static SUBSCRIPTION_PATH: Lazy<regex_lite::Regex> = Lazy::new(|| {
        regex_lite::Regex::new(r"/subscribers/[^/]+/subscriptions(/[^/]+)?$").unwrap()
    });
    static SUBSCRIBER_PATH: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/subscribers/[^/]+$").unwrap());

    if let Some(caps) = SUBSCRIPTION_PATH.captures(path) {
        let template = if caps.get(1).is_some() {
            "/subscribers/{subscriber}/subscriptions/{series}"
        } else {
            "/subscribers/{subscriber}/subscriptions"
        };
        return SUBSCRIPTION_PATH.replace(path, template).to_string();
    }
    if SUBSCRIBER_PATH.is_match(path) {
        return SUBSCRIBER_PATH
            .replace(path, "/subscribers/{subscriber}")
            .to_string();
    }

    let result = TORRENT_PATH.replace(path, "/torrents/{subscriber}/{file}");
    let result = FEED_PATH.replace(&result, "/feeds/{subscriber}");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_feed() {
        assert_eq!(
            normalize_path("/api/v1/feeds/42"),
            "/api/v1/feeds/{subscriber}"
        );
    }

    #[test]
    fn test_normalize_path_torrent() {
        assert_eq!(
            normalize_path("/api/v1/torrents/42/The.Flash.S08E13.mkv.torrent"),
            "/api/v1/torrents/{subscriber}/{file}"
        );
    }

    #[test]
    fn test_normalize_path_subscribers() {
        assert_eq!(
            normalize_path("/api/v1/subscribers/42"),
            "/api/v1/subscribers/{subscriber}"
        );
        assert_eq!(
            normalize_path("/api/v1/subscribers/42/subscriptions"),
            "/api/v1/subscribers/{subscriber}/subscriptions"
        );
        assert_eq!(
            normalize_path("/api/v1/subscribers/42/subscriptions/Arrow"),
            "/api/v1/subscribers/{subscriber}/subscriptions/{series}"
        );
    }

    #[test]
    fn test_normalize_path_static() {
        assert_eq!(normalize_path("/api/v1/health"), "/api/v1/health");
        assert_eq!(normalize_path("/api/v1/sync"), "/api/v1/sync");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/api/v1/health", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("episodecast_http_requests_total"));
        assert!(output.contains("# TYPE"));
    }
}
