//! Sync engine error and report types.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::error::StoreError;
use crate::feed::FeedError;
use crate::torrent::{FetchError, InspectError, PersonalizeError};

/// Errors raised while running a sync cycle.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Upstream feed error: {0}")]
    Feed(#[from] FeedError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Descriptor download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(#[from] InspectError),

    #[error("Personalization failed: {0}")]
    Personalize(#[from] PersonalizeError),

    #[error("Subscriber not found: {0}")]
    SubscriberNotFound(String),
}

impl SyncError {
    /// A store could not be reached; the work is worth retrying.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, SyncError::Store(e) if e.is_unavailable())
    }
}

/// Summary of one sync cycle.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CycleReport {
    pub started_at: Option<DateTime<Utc>>,
    pub duration_ms: u64,
    /// Upstream snapshot equals the last processed one; nothing was done.
    pub unchanged: bool,
    pub items_total: usize,
    /// Titles no grammar recognized.
    pub items_unparseable: usize,
    pub items_season_packs: usize,
    /// Stale or duplicate releases, or links without a tracker id.
    pub items_skipped: usize,
    /// Releases that updated the catalog and were fanned out.
    pub items_published: usize,
    /// Items whose processing failed; any failure keeps the old snapshot.
    pub items_failed: usize,
    /// Personalized descriptors delivered to subscriber feeds.
    pub deliveries: usize,
    pub delivery_failures: usize,
    pub snapshot_advanced: bool,
}

impl CycleReport {
    pub fn result_label(&self) -> &'static str {
        if self.unchanged {
            "unchanged"
        } else if self.items_failed > 0 {
            "partial_failure"
        } else {
            "success"
        }
    }
}
