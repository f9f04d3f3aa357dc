//! Common test utilities for route testing with mocks.
//!
//! This module provides a test fixture that builds the full router in
//! process, with in-memory stores and mocked upstream services, so tests can
//! run sync cycles and read the produced artifacts over HTTP.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use episodecast_core::{
    load_config_from_str, testing::{MockDescriptorFetcher, MockFeedSource}, DescriptorStore,
    FeedSyncEngine, FsDescriptorStore, Quality, SeriesCatalog, SqliteSeriesStore,
    SqliteSnapshotStore, SqliteSubscriberFeedStore, SqliteSubscriberStore, Subscriber,
    SubscriberFeedMaintainer, SubscriberStore, SyncComponents, TorrentPersonalizer,
};
use episodecast_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use episodecast_core::testing::fixtures;

pub const PUBLIC_URL: &str = "https://cast.example.org";

const CONFIG: &str = r#"
[server]
public_url = "https://cast.example.org"

[upstream]
feed_url = "https://tracker.example/rss.xml"
descriptor_url = "https://tracker.example/download.php?id={id}"
cookie = "uid=1; pass=secret"

[trackers]
announce = ["http://bt.example/announce.php?uk={token}"]
"#;

/// Test fixture with an in-process router and controllable upstream mocks.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_feed() {
///     let fixture = TestFixture::new();
///     fixture.subscribe("42", "token", "Флэш (The Flash)", Quality::Mp4);
///     fixture.source.set_items(vec![/* items */]).await;
///
///     fixture.post("/api/v1/sync").await;
///     let response = fixture.get("/api/v1/feeds/42").await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock upstream feed
    pub source: Arc<MockFeedSource>,
    /// Mock descriptor download
    pub fetcher: Arc<MockDescriptorFetcher>,
    pub subscribers: Arc<SqliteSubscriberStore>,
    pub descriptors: Arc<FsDescriptorStore>,
    /// Temporary directory for descriptor files
    pub temp_dir: TempDir,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.bytes).unwrap_or(Value::Null)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
    }
}

impl TestFixture {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config = load_config_from_str(CONFIG).expect("Test config is valid");

        let source = Arc::new(MockFeedSource::new());
        let fetcher = Arc::new(MockDescriptorFetcher::new());
        let subscribers = Arc::new(SqliteSubscriberStore::in_memory().unwrap());
        let descriptors = Arc::new(FsDescriptorStore::new(temp_dir.path().join("torrents")));
        let catalog = Arc::new(
            SeriesCatalog::load(Arc::new(SqliteSeriesStore::in_memory().unwrap())).unwrap(),
        );
        let feeds = Arc::new(SubscriberFeedMaintainer::new(
            Arc::new(SqliteSubscriberFeedStore::in_memory().unwrap()),
            descriptors.clone(),
            config.sync.feed_limit,
        ));

        let components = SyncComponents {
            source: source.clone(),
            snapshots: Arc::new(SqliteSnapshotStore::in_memory().unwrap()),
            catalog: catalog.clone(),
            fetcher: fetcher.clone(),
            descriptors: descriptors.clone(),
            subscribers: subscribers.clone(),
            feeds: feeds.clone(),
            personalizer: TorrentPersonalizer::new(config.trackers.announce.clone()),
        };
        let engine = Arc::new(FeedSyncEngine::new(
            components,
            &config.sync,
            config.server.public_url.clone(),
        ));

        let descriptor_store: Arc<dyn DescriptorStore> = descriptors.clone();
        let subscriber_store: Arc<dyn SubscriberStore> = subscribers.clone();
        let state = AppState::new(
            config,
            engine,
            catalog,
            subscriber_store,
            feeds,
            descriptor_store,
        );

        Self {
            router: create_router(Arc::new(state)),
            source,
            fetcher,
            subscribers,
            descriptors,
            temp_dir,
        }
    }

    /// Register a subscriber following one series.
    pub fn subscribe(&self, id: &str, token: &str, series: &str, quality: Quality) {
        let mut subscriber = Subscriber::new(id, token);
        subscriber.subscribe(series, quality);
        self.subscribers.save(&subscriber).unwrap();
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path).await
    }

    pub async fn post(&self, path: &str) -> TestResponse {
        self.request("POST", path).await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.request("DELETE", path).await
    }

    pub async fn put_json(&self, path: &str, body: Value) -> TestResponse {
        let request = Request::builder()
            .method("PUT")
            .uri(path)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn request(&self, method: &str, path: &str) -> TestResponse {
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        TestResponse {
            status,
            headers,
            bytes,
        }
    }
}
