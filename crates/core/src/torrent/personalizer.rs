//! Per-subscriber tracker list rewriting.
//!
//! The canonical descriptor is decoded once and shared read-only; every
//! personalization builds its own output, so no lock is needed across
//! concurrent subscribers. Only `announce` and `announce-list` are encoded
//! anew. Every other top-level value, the `info` dictionary included, is
//! copied from the canonical bytes as-is, so the info hash cannot change
//! even when upstream dictionaries are not in canonical key order.

use serde_bencode::value::Value;
use thiserror::Error;

use crate::feed::descriptor_file_name;

const ANNOUNCE: &[u8] = b"announce";
const ANNOUNCE_LIST: &[u8] = b"announce-list";
const INFO: &[u8] = b"info";
const NAME: &[u8] = b"name";
const NAME_UTF8: &[u8] = b"name.utf-8";

/// Placeholder replaced by the subscriber's tracking token.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

/// Errors that can occur while personalizing a descriptor.
#[derive(Debug, Error)]
pub enum PersonalizeError {
    #[error("Failed to decode descriptor: {0}")]
    Decode(String),

    #[error("Descriptor root is not a dictionary")]
    NotADictionary,

    #[error("Descriptor has no display name")]
    MissingDisplayName,

    #[error("No announce templates configured")]
    NoTrackers,

    #[error("Failed to encode descriptor: {0}")]
    Encode(String),
}

/// Canonical (un-personalized) descriptor: the decoded tree for lookups and
/// the raw top-level entries for re-assembly.
#[derive(Debug, Clone)]
pub struct CanonicalDescriptor {
    root: Value,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
}

impl CanonicalDescriptor {
    /// Decode a bencoded descriptor.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PersonalizeError> {
        let root: Value =
            serde_bencode::from_bytes(bytes).map_err(|e| PersonalizeError::Decode(e.to_string()))?;
        if !matches!(root, Value::Dict(_)) {
            return Err(PersonalizeError::NotADictionary);
        }
        let entries = dict_entries(bytes)?
            .into_iter()
            .map(|(key, value)| (key.to_vec(), value.to_vec()))
            .collect();
        Ok(Self { root, entries })
    }

    /// User-visible name (`info.name.utf-8`, falling back to `info.name`).
    pub fn display_name(&self) -> Option<String> {
        display_name_of(&self.root)
    }

    /// Current tracker URLs: `announce-list` flattened, or `announce` alone.
    pub fn trackers(&self) -> Vec<String> {
        trackers_of(&self.root)
    }
}

/// Personalized descriptor ready to be stored.
#[derive(Debug, Clone)]
pub struct PersonalizedDescriptor {
    pub display_name: String,
    pub bytes: Vec<u8>,
}

impl PersonalizedDescriptor {
    /// `<display-name>.torrent`
    pub fn file_name(&self) -> String {
        descriptor_file_name(&self.display_name)
    }
}

/// Builds subscriber-specific descriptors from announce URL templates.
#[derive(Debug, Clone)]
pub struct TorrentPersonalizer {
    templates: Vec<String>,
}

impl TorrentPersonalizer {
    pub fn new(templates: Vec<String>) -> Self {
        Self { templates }
    }

    /// Tracker URLs for `token`, in template order.
    pub fn tracker_urls(&self, token: &str) -> Vec<String> {
        let encoded = urlencoding::encode(token);
        self.templates
            .iter()
            .map(|t| t.replace(TOKEN_PLACEHOLDER, &encoded))
            .collect()
    }

    /// Replace the tracker list of a copy of `canonical` with the subscriber's
    /// trackers.
    ///
    /// `announce` becomes the first URL and `announce-list` a single tier
    /// holding every URL.
    pub fn personalize(
        &self,
        canonical: &CanonicalDescriptor,
        token: &str,
    ) -> Result<PersonalizedDescriptor, PersonalizeError> {
        let urls = self.tracker_urls(token);
        let Some(primary) = urls.first().cloned() else {
            return Err(PersonalizeError::NoTrackers);
        };

        let display_name =
            display_name_of(&canonical.root).ok_or(PersonalizeError::MissingDisplayName)?;

        let tier = urls
            .into_iter()
            .map(|url| Value::Bytes(url.into_bytes()))
            .collect();
        let mut entries: Vec<(&[u8], Vec<u8>)> = canonical
            .entries
            .iter()
            .filter(|(key, _)| key.as_slice() != ANNOUNCE && key.as_slice() != ANNOUNCE_LIST)
            .map(|(key, value)| (key.as_slice(), value.clone()))
            .collect();
        entries.push((ANNOUNCE, encode(&Value::Bytes(primary.into_bytes()))?));
        entries.push((ANNOUNCE_LIST, encode(&Value::List(vec![Value::List(tier)]))?));
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut bytes = vec![b'd'];
        for (key, value) in entries {
            bytes.extend_from_slice(key.len().to_string().as_bytes());
            bytes.push(b':');
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&value);
        }
        bytes.push(b'e');

        Ok(PersonalizedDescriptor {
            display_name,
            bytes,
        })
    }
}

fn encode(value: &Value) -> Result<Vec<u8>, PersonalizeError> {
    serde_bencode::to_bytes(value).map_err(|e| PersonalizeError::Encode(e.to_string()))
}

/// Top-level `(key, raw value)` pairs of a bencoded dictionary, in source
/// order. Values are the exact encoded bytes.
fn dict_entries(bytes: &[u8]) -> Result<Vec<(&[u8], &[u8])>, PersonalizeError> {
    if bytes.first() != Some(&b'd') {
        return Err(PersonalizeError::NotADictionary);
    }

    let mut entries = Vec::new();
    let mut pos = 1;
    while bytes.get(pos) != Some(&b'e') {
        let key_end = value_end(bytes, pos)?;
        let key = string_payload(&bytes[pos..key_end])?;
        let value_stop = value_end(bytes, key_end)?;
        entries.push((key, &bytes[key_end..value_stop]));
        pos = value_stop;
    }
    Ok(entries)
}

/// Index one past the bencoded value starting at `start`.
fn value_end(bytes: &[u8], start: usize) -> Result<usize, PersonalizeError> {
    let truncated = || PersonalizeError::Decode(format!("truncated value at byte {}", start));

    match *bytes.get(start).ok_or_else(truncated)? {
        b'i' => bytes[start..]
            .iter()
            .position(|&b| b == b'e')
            .map(|offset| start + offset + 1)
            .ok_or_else(truncated),
        b'l' | b'd' => {
            let mut pos = start + 1;
            while *bytes.get(pos).ok_or_else(truncated)? != b'e' {
                pos = value_end(bytes, pos)?;
            }
            Ok(pos + 1)
        }
        b'0'..=b'9' => {
            let colon = bytes[start..]
                .iter()
                .position(|&b| b == b':')
                .map(|offset| start + offset)
                .ok_or_else(truncated)?;
            let len: usize = std::str::from_utf8(&bytes[start..colon])
                .ok()
                .and_then(|digits| digits.parse().ok())
                .ok_or_else(|| PersonalizeError::Decode(format!("bad length at byte {}", start)))?;
            let end = colon + 1 + len;
            if end > bytes.len() {
                return Err(truncated());
            }
            Ok(end)
        }
        other => Err(PersonalizeError::Decode(format!(
            "unexpected byte {:#04x} at {}",
            other, start
        ))),
    }
}

/// Payload of an encoded byte string (`<len>:<payload>`).
fn string_payload(encoded: &[u8]) -> Result<&[u8], PersonalizeError> {
    encoded
        .iter()
        .position(|&b| b == b':')
        .filter(|_| encoded.first().is_some_and(u8::is_ascii_digit))
        .map(|colon| &encoded[colon + 1..])
        .ok_or_else(|| PersonalizeError::Decode("dictionary key is not a string".to_string()))
}

fn display_name_of(root: &Value) -> Option<String> {
    let Value::Dict(dict) = root else {
        return None;
    };
    let Some(Value::Dict(info)) = dict.get(INFO) else {
        return None;
    };

    [NAME_UTF8, NAME]
        .iter()
        .filter_map(|key| match info.get(*key) {
            Some(Value::Bytes(raw)) => Some(String::from_utf8_lossy(raw).trim().to_string()),
            _ => None,
        })
        .find(|name| !name.is_empty())
}

fn trackers_of(root: &Value) -> Vec<String> {
    let Value::Dict(dict) = root else {
        return Vec::new();
    };

    if let Some(Value::List(tiers)) = dict.get(ANNOUNCE_LIST) {
        let urls: Vec<String> = tiers
            .iter()
            .filter_map(|tier| match tier {
                Value::List(urls) => Some(urls),
                _ => None,
            })
            .flatten()
            .filter_map(|url| match url {
                Value::Bytes(raw) => Some(String::from_utf8_lossy(raw).into_owned()),
                _ => None,
            })
            .collect();
        if !urls.is_empty() {
            return urls;
        }
    }

    match dict.get(ANNOUNCE) {
        Some(Value::Bytes(raw)) => vec![String::from_utf8_lossy(raw).into_owned()],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use crate::torrent::inspect_descriptor;

    fn personalizer() -> TorrentPersonalizer {
        TorrentPersonalizer::new(vec![
            "http://bt.example/announce.php?uk={token}".to_string(),
            "http://bt2.example/announce.php?uk={token}".to_string(),
        ])
    }

    #[test]
    fn test_tracker_urls_substitute_token() {
        let urls = personalizer().tracker_urls("abc 123");
        assert_eq!(
            urls,
            vec![
                "http://bt.example/announce.php?uk=abc%20123",
                "http://bt2.example/announce.php?uk=abc%20123",
            ]
        );
    }

    #[test]
    fn test_personalize_replaces_trackers_only() {
        let original = fixtures::torrent_bytes("The.Flash.S08E13.720p.mkv");
        let canonical = CanonicalDescriptor::from_bytes(&original).unwrap();
        assert_eq!(canonical.trackers(), vec!["http://upstream.example/announce"]);

        let personalized = personalizer().personalize(&canonical, "deadbeef").unwrap();
        assert_eq!(personalized.display_name, "The.Flash.S08E13.720p.mkv");
        assert_eq!(personalized.file_name(), "The.Flash.S08E13.720p.mkv.torrent");

        let reparsed = CanonicalDescriptor::from_bytes(&personalized.bytes).unwrap();
        assert_eq!(
            reparsed.trackers(),
            vec![
                "http://bt.example/announce.php?uk=deadbeef",
                "http://bt2.example/announce.php?uk=deadbeef",
            ]
        );

        let before = inspect_descriptor(&original).unwrap();
        let after = inspect_descriptor(&personalized.bytes).unwrap();
        assert_eq!(before.info_hash, after.info_hash);
        assert_eq!(before.name, after.name);
        assert_eq!(before.total_size, after.total_size);
    }

    #[test]
    fn test_personalize_copies_unsorted_info_verbatim() {
        let upstream = "http://upstream.example/announce";
        // `name` before `length`: not canonical key order.
        let info = format!(
            "d4:name8:Show.mkv6:lengthi1000e12:piece lengthi16384e6:pieces20:{}e",
            "a".repeat(20)
        );
        let original = format!(
            "d8:announce{}:{}7:comment4:test4:info{}e",
            upstream.len(),
            upstream,
            info
        )
        .into_bytes();

        let canonical = CanonicalDescriptor::from_bytes(&original).unwrap();
        let personalized = personalizer().personalize(&canonical, "deadbeef").unwrap();
        assert_eq!(personalized.display_name, "Show.mkv");

        let entries = dict_entries(&personalized.bytes).unwrap();
        let keys: Vec<&[u8]> = entries.iter().map(|(key, _)| *key).collect();
        assert_eq!(
            keys,
            vec![
                &b"announce"[..],
                &b"announce-list"[..],
                &b"comment"[..],
                &b"info"[..],
            ]
        );
        let (_, copied) = entries.iter().find(|(key, _)| *key == INFO).unwrap();
        assert_eq!(*copied, info.as_bytes());

        let reparsed = CanonicalDescriptor::from_bytes(&personalized.bytes).unwrap();
        assert_eq!(
            reparsed.trackers(),
            vec![
                "http://bt.example/announce.php?uk=deadbeef",
                "http://bt2.example/announce.php?uk=deadbeef",
            ]
        );
    }

    #[test]
    fn test_dict_entries_rejects_truncated_input() {
        assert!(matches!(
            dict_entries(b"d4:infod4:name3:abe"),
            Err(PersonalizeError::Decode(_))
        ));
        assert!(matches!(
            dict_entries(b"d4:info10:shorte"),
            Err(PersonalizeError::Decode(_))
        ));
    }

    #[test]
    fn test_personalize_leaves_canonical_untouched() {
        let original = fixtures::torrent_bytes("Show.S01E01.mkv");
        let canonical = CanonicalDescriptor::from_bytes(&original).unwrap();

        let first = personalizer().personalize(&canonical, "one").unwrap();
        let second = personalizer().personalize(&canonical, "two").unwrap();

        assert_ne!(first.bytes, second.bytes);
        assert_eq!(canonical.trackers(), vec!["http://upstream.example/announce"]);
    }

    #[test]
    fn test_personalize_without_name_fails_closed() {
        let bytes = fixtures::torrent_bytes_without_name();
        let canonical = CanonicalDescriptor::from_bytes(&bytes).unwrap();
        let result = personalizer().personalize(&canonical, "token");
        assert!(matches!(result, Err(PersonalizeError::MissingDisplayName)));
    }

    #[test]
    fn test_personalize_without_templates_fails() {
        let bytes = fixtures::torrent_bytes("Show.S01E01.mkv");
        let canonical = CanonicalDescriptor::from_bytes(&bytes).unwrap();
        let result = TorrentPersonalizer::new(vec![]).personalize(&canonical, "token");
        assert!(matches!(result, Err(PersonalizeError::NoTrackers)));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            CanonicalDescriptor::from_bytes(b"<html>login</html>"),
            Err(PersonalizeError::Decode(_))
        ));
        assert!(matches!(
            CanonicalDescriptor::from_bytes(b"i42e"),
            Err(PersonalizeError::NotADictionary)
        ));
    }
}
