//! Types produced by the release title parser.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Encoding/resolution class of a release. Each series tracks the three
/// tiers independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quality {
    /// Standard definition.
    #[serde(rename = "SD")]
    Sd,
    /// 720p tier, published upstream under the `MP4` marker.
    #[serde(rename = "MP4")]
    Mp4,
    /// 1080p tier.
    #[serde(rename = "1080")]
    FullHd,
}

impl Quality {
    /// All tiers, lowest first.
    pub const ALL: [Quality; 3] = [Quality::Sd, Quality::Mp4, Quality::FullHd];

    /// Canonical marker as used in release titles and stored records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Sd => "SD",
            Quality::Mp4 => "MP4",
            Quality::FullHd => "1080",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown quality markers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown quality marker: {0}")]
pub struct UnknownQuality(pub String);

impl FromStr for Quality {
    type Err = UnknownQuality;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sd" => Ok(Quality::Sd),
            "mp4" | "720" | "720p" => Ok(Quality::Mp4),
            "1080" | "1080p" => Ok(Quality::FullHd),
            other => Err(UnknownQuality(other.to_string())),
        }
    }
}

/// Structured fields extracted from a release title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEpisode {
    /// Series name in the catalog's local language.
    pub series_name_local: String,
    /// Original (foreign) series name.
    pub series_name_foreign: String,
    /// Episode title.
    pub episode_name: String,
    pub season: u32,
    pub episode: u32,
    pub quality: Quality,
    /// Raw title up to (not including) the quality bracket.
    pub display_title: String,
}

impl ParsedEpisode {
    /// Catalog key: `"<local> (<foreign>)"`.
    pub fn series_name(&self) -> String {
        format!("{} ({})", self.series_name_local, self.series_name_foreign)
    }

    /// The (season, episode) pair used by the merge rule.
    pub fn position(&self) -> (u32, u32) {
        (self.season, self.episode)
    }
}

/// Result of parsing a release title.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TitleParse {
    /// A single episode release.
    Episode(ParsedEpisode),
    /// A full-season pack (`E999` marker); never updates series state.
    SeasonPack(ParsedEpisode),
    /// Title matches none of the known grammars.
    Unparseable,
}

impl TitleParse {
    /// The parsed episode, if this is a regular episode release.
    pub fn episode(&self) -> Option<&ParsedEpisode> {
        match self {
            TitleParse::Episode(ep) => Some(ep),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_from_str() {
        assert_eq!("SD".parse::<Quality>().unwrap(), Quality::Sd);
        assert_eq!("mp4".parse::<Quality>().unwrap(), Quality::Mp4);
        assert_eq!("720p".parse::<Quality>().unwrap(), Quality::Mp4);
        assert_eq!("1080p".parse::<Quality>().unwrap(), Quality::FullHd);
        assert_eq!("1080".parse::<Quality>().unwrap(), Quality::FullHd);
        assert!("4K".parse::<Quality>().is_err());
    }

    #[test]
    fn test_quality_serialization_uses_markers() {
        assert_eq!(serde_json::to_string(&Quality::FullHd).unwrap(), "\"1080\"");
        let q: Quality = serde_json::from_str("\"MP4\"").unwrap();
        assert_eq!(q, Quality::Mp4);
    }

    #[test]
    fn test_series_name() {
        let ep = ParsedEpisode {
            series_name_local: "Флэш".to_string(),
            series_name_foreign: "The Flash".to_string(),
            episode_name: "Падение смерти".to_string(),
            season: 8,
            episode: 13,
            quality: Quality::Mp4,
            display_title: String::new(),
        };
        assert_eq!(ep.series_name(), "Флэш (The Flash)");
        assert_eq!(ep.position(), (8, 13));
    }
}
