use std::sync::Arc;

use chrono::{DateTime, Utc};
use episodecast_core::{
    Config, DescriptorStore, FeedSyncEngine, SanitizedConfig, SeriesCatalog,
    SubscriberFeedMaintainer, SubscriberRegistry, SubscriberStore, SyncScheduler,
};

/// Shared application state
pub struct AppState {
    config: Config,
    started_at: DateTime<Utc>,
    engine: Arc<FeedSyncEngine>,
    catalog: Arc<SeriesCatalog>,
    subscribers: Arc<dyn SubscriberStore>,
    feeds: Arc<SubscriberFeedMaintainer>,
    descriptors: Arc<dyn DescriptorStore>,
    registry: SubscriberRegistry,
    scheduler: Option<Arc<SyncScheduler>>,
}

impl AppState {
    pub fn new(
        config: Config,
        engine: Arc<FeedSyncEngine>,
        catalog: Arc<SeriesCatalog>,
        subscribers: Arc<dyn SubscriberStore>,
        feeds: Arc<SubscriberFeedMaintainer>,
        descriptors: Arc<dyn DescriptorStore>,
    ) -> Self {
        let registry = SubscriberRegistry::new(Arc::clone(&subscribers), Arc::clone(&feeds));
        Self {
            config,
            started_at: Utc::now(),
            engine,
            catalog,
            subscribers,
            feeds,
            descriptors,
            registry,
            scheduler: None,
        }
    }

    /// Attach the running sync scheduler.
    pub fn with_scheduler(mut self, scheduler: Arc<SyncScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn public_url(&self) -> &str {
        self.config.server.public_url.trim_end_matches('/')
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn engine(&self) -> &FeedSyncEngine {
        self.engine.as_ref()
    }

    pub fn catalog(&self) -> &SeriesCatalog {
        self.catalog.as_ref()
    }

    pub fn subscribers(&self) -> &dyn SubscriberStore {
        self.subscribers.as_ref()
    }

    pub fn feeds(&self) -> &SubscriberFeedMaintainer {
        self.feeds.as_ref()
    }

    /// Subscriber edits that keep feeds in step.
    pub fn registry(&self) -> &SubscriberRegistry {
        &self.registry
    }

    pub fn descriptors(&self) -> &dyn DescriptorStore {
        self.descriptors.as_ref()
    }

    pub fn scheduler(&self) -> Option<&SyncScheduler> {
        self.scheduler.as_deref()
    }
}
