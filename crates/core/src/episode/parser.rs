//! Release title parser.
//!
//! Upstream titles follow
//! `"<local> (<foreign>). <episode> (S<season>E<episode>) [<quality>]"`.
//! Grammars are tried in order; the first match wins.

use once_cell::sync::Lazy;
use regex_lite::{Captures, Regex};

use super::types::{ParsedEpisode, Quality, TitleParse};

/// Episode marker used upstream for full-season packs.
const SEASON_PACK_MARKER: &str = "E999";

/// How a grammar determines the quality tier.
#[derive(Debug, Clone, Copy)]
enum QualitySource {
    /// Read from the `quality` capture group.
    Captured,
    /// Grammar has no quality marker; the tier is fixed.
    Fixed(Quality),
}

struct Grammar {
    name: &'static str,
    regex: Regex,
    quality: QualitySource,
}

static GRAMMARS: Lazy<Vec<Grammar>> = Lazy::new(|| {
    vec![
        Grammar {
            name: "with_quality",
            regex: Regex::new(
                r"^(?P<local>.+?) \((?P<foreign>.+?)\)\. (?P<episode>.+) \(S(?P<season>[0-9]+)E(?P<number>[0-9]+)\) (?P<bracket>\[(?P<quality>(?i:SD|MP4|1080p?))\])\s*$",
            )
            .expect("quality grammar is valid"),
            quality: QualitySource::Captured,
        },
        Grammar {
            name: "fallback",
            regex: Regex::new(
                r"^(?P<local>.+?) \((?P<foreign>.+?)\)\. (?P<episode>.+) \(S(?P<season>[0-9]+)E(?P<number>[0-9]+)\)\s*$",
            )
            .expect("fallback grammar is valid"),
            quality: QualitySource::Fixed(Quality::Sd),
        },
    ]
});

/// Parse a raw release title.
///
/// Never fails: titles outside both grammars yield [`TitleParse::Unparseable`],
/// which callers skip.
pub fn parse_title(title: &str) -> TitleParse {
    let title = title.trim_start();

    for grammar in GRAMMARS.iter() {
        let Some(caps) = grammar.regex.captures(title) else {
            continue;
        };

        let Some(episode) = episode_from_captures(title, &caps, grammar.quality) else {
            tracing::debug!(grammar = grammar.name, title, "Title matched but fields were invalid");
            return TitleParse::Unparseable;
        };

        if title.contains(SEASON_PACK_MARKER) {
            return TitleParse::SeasonPack(episode);
        }
        return TitleParse::Episode(episode);
    }

    TitleParse::Unparseable
}

fn episode_from_captures(
    title: &str,
    caps: &Captures<'_>,
    quality: QualitySource,
) -> Option<ParsedEpisode> {
    let quality = match quality {
        QualitySource::Captured => caps.name("quality")?.as_str().parse::<Quality>().ok()?,
        QualitySource::Fixed(q) => q,
    };

    let display_title = match caps.name("bracket") {
        Some(bracket) => title[..bracket.start()].to_string(),
        None => title.to_string(),
    };

    Some(ParsedEpisode {
        series_name_local: caps.name("local")?.as_str().to_string(),
        series_name_foreign: caps.name("foreign")?.as_str().to_string(),
        episode_name: caps.name("episode")?.as_str().to_string(),
        season: caps.name("season")?.as_str().parse().ok()?,
        episode: caps.name("number")?.as_str().parse().ok()?,
        quality,
        display_title,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expect_episode(title: &str) -> ParsedEpisode {
        match parse_title(title) {
            TitleParse::Episode(ep) => ep,
            other => panic!("expected episode for {:?}, got {:?}", title, other),
        }
    }

    #[test]
    fn test_parse_mp4_title() {
        let ep = expect_episode("Флэш (The Flash). Падение смерти (S08E13) [MP4]");
        assert_eq!(ep.series_name_local, "Флэш");
        assert_eq!(ep.series_name_foreign, "The Flash");
        assert_eq!(ep.series_name(), "Флэш (The Flash)");
        assert_eq!(ep.episode_name, "Падение смерти");
        assert_eq!(ep.season, 8);
        assert_eq!(ep.episode, 13);
        assert_eq!(ep.quality, Quality::Mp4);
        assert_eq!(ep.display_title, "Флэш (The Flash). Падение смерти (S08E13) ");
    }

    #[test]
    fn test_parse_1080p_normalizes() {
        let ep = expect_episode("Флэш (The Flash). Падение смерти (S08E13) [1080p]");
        assert_eq!(ep.quality, Quality::FullHd);

        let ep = expect_episode("Флэш (The Flash). Падение смерти (S08E13) [1080]");
        assert_eq!(ep.quality, Quality::FullHd);
    }

    #[test]
    fn test_parse_sd_title() {
        let ep = expect_episode("Флэш (The Flash). Падение смерти (S08E13) [SD]");
        assert_eq!(ep.quality, Quality::Sd);
    }

    #[test]
    fn test_fallback_without_quality_marker() {
        let ep = expect_episode("Флэш (The Flash). Падение смерти (S08E13)");
        assert_eq!(ep.quality, Quality::Sd);
        assert_eq!(ep.season, 8);
        assert_eq!(ep.display_title, "Флэш (The Flash). Падение смерти (S08E13)");
    }

    #[test]
    fn test_series_name_with_nested_dots() {
        let ep = expect_episode("Мистер Робот (Mr. Robot). eps3.0_power-saver-mode.h (S03E01) [MP4]");
        assert_eq!(ep.series_name_foreign, "Mr. Robot");
        assert_eq!(ep.episode_name, "eps3.0_power-saver-mode.h");
        assert_eq!(ep.position(), (3, 1));
    }

    #[test]
    fn test_season_pack_is_flagged() {
        let result = parse_title("Флэш (The Flash). Сезон 8 (S08E999) [1080p]");
        assert!(matches!(result, TitleParse::SeasonPack(_)));
        assert!(result.episode().is_none());
    }

    #[test]
    fn test_unknown_quality_is_unparseable() {
        assert_eq!(
            parse_title("Флэш (The Flash). Падение смерти (S08E13) [4K]"),
            TitleParse::Unparseable
        );
    }

    #[test]
    fn test_free_text_is_unparseable() {
        assert_eq!(parse_title("Новости сайта"), TitleParse::Unparseable);
        assert_eq!(parse_title(""), TitleParse::Unparseable);
        assert_eq!(
            parse_title("The Flash S08E13 1080p WEB-DL"),
            TitleParse::Unparseable
        );
    }
}
