use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::sync::SyncConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub upstream: UpstreamConfig,
    pub trackers: TrackersConfig,
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Base URL used when building personalized download links
    /// (e.g., "https://cast.example.org").
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_public_url() -> String {
    "http://localhost:8080".to_string()
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("episodecast.db")
}

/// Descriptor file storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root directory for canonical and personalized .torrent files.
    #[serde(default = "default_descriptor_dir")]
    pub descriptor_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            descriptor_dir: default_descriptor_dir(),
        }
    }
}

fn default_descriptor_dir() -> PathBuf {
    PathBuf::from("torrents")
}

/// Upstream release tracker configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// RSS feed URL listing the latest releases.
    pub feed_url: String,
    /// Download URL template for a release descriptor; `{id}` is replaced
    /// by the tracker id (e.g., "https://tracker.example/download.php?id={id}").
    pub descriptor_url: String,
    /// Session cookie sent with descriptor downloads.
    #[serde(default)]
    pub cookie: Option<String>,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    30
}

/// Tracker announce templates
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TrackersConfig {
    /// Announce URL templates; `{token}` is replaced by the subscriber's
    /// tracking token. Order is preserved in the personalized descriptor.
    pub announce: Vec<String>,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub storage: StorageConfig,
    pub upstream: SanitizedUpstreamConfig,
    pub trackers: TrackersConfig,
    pub sync: SyncConfig,
}

/// Sanitized upstream config (cookie hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUpstreamConfig {
    pub feed_url: String,
    pub descriptor_url: String,
    pub cookie_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            storage: config.storage.clone(),
            upstream: SanitizedUpstreamConfig {
                feed_url: config.upstream.feed_url.clone(),
                descriptor_url: config.upstream.descriptor_url.clone(),
                cookie_configured: config
                    .upstream
                    .cookie
                    .as_ref()
                    .is_some_and(|c| !c.is_empty()),
                timeout_secs: config.upstream.timeout_secs,
            },
            trackers: config.trackers.clone(),
            sync: config.sync.clone(),
        }
    }
}
