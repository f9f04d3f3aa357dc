use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::episode::{ParsedEpisode, Quality};
use crate::feed::FeedItem;

/// Latest known release of a series in one quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySlot {
    /// Upstream release link.
    pub link: String,
    pub season: u32,
    pub episode: u32,
}

impl QualitySlot {
    /// Whether a release at `position` supersedes this slot.
    ///
    /// The comparison is component-wise: a release is stale when neither its
    /// season nor its episode number is greater than the stored one.
    pub fn is_superseded_by(&self, (season, episode): (u32, u32)) -> bool {
        !(season <= self.season && episode <= self.episode)
    }
}

/// Per-series state: the latest episode seen and one slot per quality tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// `"<local> (<foreign>)"`
    pub name: String,
    /// Display title of the most recently accepted release.
    pub last_episode_name: String,
    pub last_episode_at: DateTime<Utc>,
    pub sd: Option<QualitySlot>,
    pub mp4: Option<QualitySlot>,
    pub full_hd: Option<QualitySlot>,
}

impl Series {
    /// Create a series from its first sighted release.
    pub fn from_release(item: &FeedItem, parsed: &ParsedEpisode) -> Self {
        let mut series = Self {
            name: parsed.series_name(),
            last_episode_name: String::new(),
            last_episode_at: item.published_at,
            sd: None,
            mp4: None,
            full_hd: None,
        };
        series.apply(item, parsed);
        series
    }

    pub fn slot(&self, quality: Quality) -> Option<&QualitySlot> {
        match quality {
            Quality::Sd => self.sd.as_ref(),
            Quality::Mp4 => self.mp4.as_ref(),
            Quality::FullHd => self.full_hd.as_ref(),
        }
    }

    /// Replace one tier's slot, leaving the others and the last-episode
    /// fields alone.
    pub fn set_slot(&mut self, quality: Quality, slot: Option<QualitySlot>) {
        *self.slot_mut(quality) = slot;
    }

    fn slot_mut(&mut self, quality: Quality) -> &mut Option<QualitySlot> {
        match quality {
            Quality::Sd => &mut self.sd,
            Quality::Mp4 => &mut self.mp4,
            Quality::FullHd => &mut self.full_hd,
        }
    }

    /// Whether `parsed` would update this series. An empty tier always accepts.
    pub fn accepts(&self, parsed: &ParsedEpisode) -> bool {
        self.slot(parsed.quality)
            .map_or(true, |slot| slot.is_superseded_by(parsed.position()))
    }

    /// Record `parsed` as the latest release, touching only its tier.
    pub fn apply(&mut self, item: &FeedItem, parsed: &ParsedEpisode) {
        self.last_episode_name = parsed.display_title.clone();
        self.last_episode_at = item.published_at;
        *self.slot_mut(parsed.quality) = Some(QualitySlot {
            link: item.link.clone(),
            season: parsed.season,
            episode: parsed.episode,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(season: u32, episode: u32) -> QualitySlot {
        QualitySlot {
            link: "l".to_string(),
            season,
            episode,
        }
    }

    #[test]
    fn test_slot_superseded_component_wise() {
        let stored = slot(8, 13);
        assert!(!stored.is_superseded_by((8, 13)));
        assert!(!stored.is_superseded_by((8, 12)));
        assert!(!stored.is_superseded_by((7, 1)));
        assert!(stored.is_superseded_by((8, 14)));
        assert!(stored.is_superseded_by((9, 1)));
        // Earlier season with a higher episode number still counts as newer.
        assert!(stored.is_superseded_by((7, 20)));
    }
}
