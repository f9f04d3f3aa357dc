//! Feed synchronization engine.
//!
//! One cycle polls the upstream feed, compares it with the last fully
//! processed snapshot and, when it changed, drives every item through
//! parsing, the series catalog, descriptor caching and subscriber fan-out.
//! The new snapshot is persisted only if no item failed, so the next cycle
//! retries anything that did not go through.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use super::config::SyncConfig;
use super::types::{CycleReport, SyncError};
use crate::episode::{parse_title, ParsedEpisode, TitleParse};
use crate::feed::{
    FeedItem, FeedSource, Snapshot, SnapshotStore, SubscriberFeedItem, SubscriberFeedMaintainer,
};
use crate::metrics;
use crate::series::SeriesCatalog;
use crate::subscriber::SubscriberStore;
use crate::torrent::{
    inspect_descriptor, CanonicalDescriptor, DescriptorFetcher, DescriptorStore,
    TorrentPersonalizer,
};

/// Collaborators the engine drives.
pub struct SyncComponents {
    pub source: Arc<dyn FeedSource>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub catalog: Arc<SeriesCatalog>,
    pub fetcher: Arc<dyn DescriptorFetcher>,
    pub descriptors: Arc<dyn DescriptorStore>,
    pub subscribers: Arc<dyn SubscriberStore>,
    pub feeds: Arc<SubscriberFeedMaintainer>,
    pub personalizer: TorrentPersonalizer,
}

/// How one upstream item was handled.
#[derive(Debug)]
enum ItemOutcome {
    Unparseable,
    SeasonPack,
    Skipped,
    Published {
        deliveries: usize,
        delivery_failures: usize,
    },
    Failed,
}

impl ItemOutcome {
    fn label(&self) -> &'static str {
        match self {
            ItemOutcome::Unparseable => "unparseable",
            ItemOutcome::SeasonPack => "season_pack",
            ItemOutcome::Skipped => "skipped",
            ItemOutcome::Published { .. } => "published",
            ItemOutcome::Failed => "failed",
        }
    }
}

/// Runs sync cycles. Cycles never overlap; a caller arriving while one is
/// running waits for it to finish.
pub struct FeedSyncEngine {
    components: SyncComponents,
    public_url: String,
    max_concurrent_items: usize,
    cycle_lock: Mutex<()>,
}

impl FeedSyncEngine {
    /// `public_url` is the base of the personalized download links put in
    /// subscriber feeds.
    pub fn new(
        components: SyncComponents,
        config: &SyncConfig,
        public_url: impl Into<String>,
    ) -> Self {
        Self {
            components,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            max_concurrent_items: config.max_concurrent_items.max(1),
            cycle_lock: Mutex::new(()),
        }
    }

    /// Whether a cycle is in progress.
    pub fn is_busy(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }

    /// Run one full cycle.
    ///
    /// Returns an error only when the cycle could not run at all (feed or
    /// snapshot store unavailable). Item failures are counted in the report
    /// and keep the previous snapshot in place.
    pub async fn run_cycle(&self) -> Result<CycleReport, SyncError> {
        let _guard = self.cycle_lock.lock().await;
        let started = Instant::now();

        let result = self.run_cycle_locked().await;
        let elapsed = started.elapsed();
        metrics::CYCLE_DURATION.observe(elapsed.as_secs_f64());

        match result {
            Ok(mut report) => {
                report.duration_ms = elapsed.as_millis() as u64;
                metrics::CYCLES.with_label_values(&[report.result_label()]).inc();
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, "Sync cycle failed");
                metrics::CYCLES.with_label_values(&["failed"]).inc();
                Err(e)
            }
        }
    }

    async fn run_cycle_locked(&self) -> Result<CycleReport, SyncError> {
        let mut report = CycleReport {
            started_at: Some(Utc::now()),
            ..Default::default()
        };

        let snapshot = Snapshot::from_items(self.components.source.fetch().await?);
        let previous = self.components.snapshots.load_last()?;
        report.items_total = snapshot.len();

        if !snapshot.has_updates_since(&previous) {
            debug!(items = snapshot.len(), "Upstream feed unchanged");
            report.unchanged = true;
            return Ok(report);
        }

        info!(
            items = snapshot.len(),
            previous = previous.len(),
            "Upstream feed changed, processing"
        );

        let outcomes: Vec<ItemOutcome> = stream::iter(snapshot.items().iter().cloned())
            .map(|item| self.process_item(item))
            .buffer_unordered(self.max_concurrent_items)
            .collect()
            .await;

        for outcome in &outcomes {
            metrics::ITEMS_PROCESSED
                .with_label_values(&[outcome.label()])
                .inc();
            match outcome {
                ItemOutcome::Unparseable => report.items_unparseable += 1,
                ItemOutcome::SeasonPack => report.items_season_packs += 1,
                ItemOutcome::Skipped => report.items_skipped += 1,
                ItemOutcome::Published {
                    deliveries,
                    delivery_failures,
                } => {
                    report.items_published += 1;
                    report.deliveries += deliveries;
                    report.delivery_failures += delivery_failures;
                }
                ItemOutcome::Failed => report.items_failed += 1,
            }
        }

        if report.items_failed == 0 {
            self.components.snapshots.save(&snapshot)?;
            report.snapshot_advanced = true;
            info!(
                published = report.items_published,
                deliveries = report.deliveries,
                "Sync cycle complete"
            );
        } else {
            warn!(
                failed = report.items_failed,
                published = report.items_published,
                "Sync cycle had failures, snapshot not advanced"
            );
        }

        Ok(report)
    }

    async fn process_item(&self, item: FeedItem) -> ItemOutcome {
        let parsed = match parse_title(&item.title) {
            TitleParse::Episode(parsed) => parsed,
            TitleParse::SeasonPack(_) => {
                debug!(title = %item.title, "Season pack, skipping");
                return ItemOutcome::SeasonPack;
            }
            TitleParse::Unparseable => {
                debug!(title = %item.title, "Unparseable title, skipping");
                return ItemOutcome::Unparseable;
            }
        };

        if !self.components.catalog.would_accept(&parsed).await {
            return ItemOutcome::Skipped;
        }

        let Some(tracker_id) = item.tracker_id() else {
            warn!(title = %item.title, link = %item.link, "Release link has no tracker id, skipping");
            return ItemOutcome::Skipped;
        };

        match self.publish(&item, &parsed, &tracker_id).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => ItemOutcome::Skipped,
            Err(e) => {
                error!(
                    tracker_id = %tracker_id,
                    title = %item.title,
                    error = %e,
                    "Failed to process release"
                );
                ItemOutcome::Failed
            }
        }
    }

    /// Failures before the catalog write leave it untouched. A store outage
    /// during fan-out reverts the tier, so the whole release is retried on
    /// the next cycle; subscribers already served get the same file and feed
    /// entry again.
    async fn publish(
        &self,
        item: &FeedItem,
        parsed: &ParsedEpisode,
        tracker_id: &str,
    ) -> Result<Option<ItemOutcome>, SyncError> {
        let canonical = self.canonical_descriptor(tracker_id).await?;

        let series_name = parsed.series_name();
        let subscriber_ids = self
            .components
            .subscribers
            .find_subscribers(&series_name, parsed.quality)?;

        let Some(update) = self.components.catalog.reconcile(item, parsed).await? else {
            // Another item of this cycle already recorded the same release.
            return Ok(None);
        };

        info!(
            series = %series_name,
            quality = %parsed.quality,
            season = parsed.season,
            episode = parsed.episode,
            subscribers = subscriber_ids.len(),
            "New release"
        );

        let results = futures::future::join_all(
            subscriber_ids
                .iter()
                .map(|id| self.deliver(id, item, &series_name, &canonical)),
        )
        .await;

        let mut deliveries = 0;
        let mut delivery_failures = 0;
        let mut outage = None;
        for (subscriber_id, result) in subscriber_ids.iter().zip(results) {
            match result {
                Ok(()) => deliveries += 1,
                Err(e) if e.is_store_unavailable() => {
                    warn!(subscriber_id = %subscriber_id, tracker_id, error = %e, "Delivery failed, will retry");
                    delivery_failures += 1;
                    if outage.is_none() {
                        outage = Some(e);
                    }
                }
                Err(e) => {
                    warn!(subscriber_id = %subscriber_id, tracker_id, error = %e, "Delivery abandoned");
                    delivery_failures += 1;
                }
            }
        }
        metrics::DELIVERIES.with_label_values(&["delivered"]).inc_by(deliveries as u64);
        metrics::DELIVERIES.with_label_values(&["failed"]).inc_by(delivery_failures as u64);

        if let Some(e) = outage {
            if let Err(revert_err) = self.components.catalog.revert(parsed, &update).await {
                error!(
                    series = %series_name,
                    quality = %parsed.quality,
                    error = %revert_err,
                    "Failed to revert series tier, release will not be retried"
                );
            }
            return Err(e);
        }

        Ok(Some(ItemOutcome::Published {
            deliveries,
            delivery_failures,
        }))
    }

    /// Cached canonical descriptor, downloading and caching it on a miss.
    async fn canonical_descriptor(&self, tracker_id: &str) -> Result<CanonicalDescriptor, SyncError> {
        if let Some(bytes) = self.components.descriptors.load_canonical(tracker_id).await? {
            match CanonicalDescriptor::from_bytes(&bytes) {
                Ok(canonical) => return Ok(canonical),
                Err(e) => warn!(tracker_id, error = %e, "Cached descriptor is unreadable, downloading again"),
            }
        }

        let bytes = self.components.fetcher.fetch(tracker_id).await?;
        let info = inspect_descriptor(&bytes)?;
        let canonical = CanonicalDescriptor::from_bytes(&bytes)?;
        self.components
            .descriptors
            .save_canonical(tracker_id, &bytes)
            .await?;

        debug!(tracker_id, info_hash = %info.info_hash, "Cached canonical descriptor");
        Ok(canonical)
    }

    async fn deliver(
        &self,
        subscriber_id: &str,
        item: &FeedItem,
        series_name: &str,
        canonical: &CanonicalDescriptor,
    ) -> Result<(), SyncError> {
        let subscriber = self
            .components
            .subscribers
            .get(subscriber_id)?
            .ok_or_else(|| SyncError::SubscriberNotFound(subscriber_id.to_string()))?;

        let personalized = self
            .components
            .personalizer
            .personalize(canonical, &subscriber.tracking_token)?;

        let file_name = self
            .components
            .descriptors
            .save_user_descriptor(subscriber_id, &personalized.display_name, &personalized.bytes)
            .await?;

        let entry = SubscriberFeedItem {
            title: personalized.display_name,
            link: self.download_link(subscriber_id, &file_name),
            published_at: item.published_at,
            descriptor: Some(file_name.clone()),
            series: Some(series_name.to_string()),
        };

        let result = self.components.feeds.append(subscriber_id, entry).await?;
        if !result.cleanup.is_clean() {
            warn!(
                subscriber_id,
                failed = result.cleanup.failed.len(),
                "Some evicted descriptors could not be removed"
            );
        }

        debug!(subscriber_id, file = %file_name, "Delivered release");
        Ok(())
    }

    fn download_link(&self, subscriber_id: &str, file_name: &str) -> String {
        format!(
            "{}/api/v1/torrents/{}/{}",
            self.public_url,
            urlencoding::encode(subscriber_id),
            urlencoding::encode(file_name)
        )
    }
}
