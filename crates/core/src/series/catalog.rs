//! In-memory series catalog backed by a [`SeriesStore`].

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{QualitySlot, Series, SeriesStore};
use crate::episode::ParsedEpisode;
use crate::error::StoreError;
use crate::feed::FeedItem;

/// A release accepted by [`SeriesCatalog::reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesUpdate {
    /// The series as persisted after the merge.
    pub series: Series,
    /// What the touched tier held before.
    pub previous: Option<QualitySlot>,
}

/// Latest-episode-per-tier map for every series seen so far.
///
/// All reads and writes go through one mutex held across the
/// read-modify-persist span of [`SeriesCatalog::reconcile`].
pub struct SeriesCatalog {
    store: Arc<dyn SeriesStore>,
    series: Mutex<HashMap<String, Series>>,
}

impl SeriesCatalog {
    /// Build the catalog from everything the store holds.
    pub fn load(store: Arc<dyn SeriesStore>) -> Result<Self, StoreError> {
        let series: HashMap<String, Series> = store
            .load_all()?
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        info!(count = series.len(), "Loaded series catalog");

        Ok(Self {
            store,
            series: Mutex::new(series),
        })
    }

    /// Whether `parsed` would change the catalog. Does not mutate.
    pub async fn would_accept(&self, parsed: &ParsedEpisode) -> bool {
        let series = self.series.lock().await;
        series
            .get(&parsed.series_name())
            .map_or(true, |s| s.accepts(parsed))
    }

    /// Merge a release into the catalog.
    ///
    /// Returns the updated series with the tier's previous slot, or `None`
    /// when the stored tier already holds this or a later (season, episode).
    /// The map only changes after the store accepted the write.
    pub async fn reconcile(
        &self,
        item: &FeedItem,
        parsed: &ParsedEpisode,
    ) -> Result<Option<SeriesUpdate>, StoreError> {
        let name = parsed.series_name();
        let mut series = self.series.lock().await;

        let (updated, previous) = match series.get(&name) {
            None => (Series::from_release(item, parsed), None),
            Some(existing) if !existing.accepts(parsed) => {
                debug!(series = %name, quality = %parsed.quality, "Release is not newer, skipping");
                return Ok(None);
            }
            Some(existing) => {
                let previous = existing.slot(parsed.quality).cloned();
                let mut updated = existing.clone();
                updated.apply(item, parsed);
                (updated, previous)
            }
        };

        self.store.save(&updated)?;
        series.insert(name, updated.clone());

        debug!(
            series = %updated.name,
            quality = %parsed.quality,
            season = parsed.season,
            episode = parsed.episode,
            "Series updated"
        );
        Ok(Some(SeriesUpdate {
            series: updated,
            previous,
        }))
    }

    /// Put back the tier slot an accepted release replaced, so the release is
    /// accepted again on a later cycle.
    ///
    /// Does nothing if the tier has moved on since `update` was made.
    /// Returns whether the slot was restored.
    pub async fn revert(
        &self,
        parsed: &ParsedEpisode,
        update: &SeriesUpdate,
    ) -> Result<bool, StoreError> {
        let mut series = self.series.lock().await;
        let Some(current) = series.get(&update.series.name) else {
            return Ok(false);
        };
        if current.slot(parsed.quality) != update.series.slot(parsed.quality) {
            return Ok(false);
        }

        let mut restored = current.clone();
        restored.set_slot(parsed.quality, update.previous.clone());
        self.store.save(&restored)?;
        series.insert(restored.name.clone(), restored);

        debug!(
            series = %update.series.name,
            quality = %parsed.quality,
            "Series tier reverted"
        );
        Ok(true)
    }

    pub async fn get(&self, name: &str) -> Option<Series> {
        self.series.lock().await.get(name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.series.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.series.lock().await.is_empty()
    }
}
