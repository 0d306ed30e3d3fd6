//! Deployment settings for the portal backend.
//!
//! Settings come from an optional TOML file with per-field environment
//! overrides (`FEEDGATE_*`, env wins). The file is optional — a missing
//! file yields `Settings::default()` — so a deployment can run on
//! environment variables alone. Unknown keys are silently ignored by
//! serde, though we log a warning when the file contains potential typos.
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::feed::FeedKind;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in settings file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Settings file exceeds the maximum allowed size.
    #[error("Settings file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Settings
// ============================================================================

/// Deployment configuration consumed by the core.
///
/// All fields use `#[serde(default)]` so any subset of keys can be
/// specified; missing keys fall back to defaults. The three feed URLs are
/// the *environment-level defaults* — the remote config document (see
/// [`crate::resolver`]) can override each one independently at runtime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Feed cache TTL in seconds.
    pub feed_ttl_seconds: u64,

    /// Remote config document TTL in seconds.
    pub config_ttl_seconds: u64,

    /// Upstream fetch timeout in seconds (covers the whole exchange).
    pub fetch_timeout_seconds: u64,

    /// URL of the remotely hosted config document. None disables remote
    /// config entirely.
    pub config_url: Option<String>,

    /// Default blog feed URL.
    pub blog_feed_url: Option<String>,

    /// Default video feed URL.
    pub video_feed_url: Option<String>,

    /// Default podcast feed URL.
    pub podcast_feed_url: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            feed_ttl_seconds: 180,
            config_ttl_seconds: 300,
            fetch_timeout_seconds: 10,
            config_url: None,
            blog_feed_url: None,
            video_feed_url: None,
            podcast_feed_url: None,
        }
    }
}

impl Settings {
    /// Maximum settings file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load settings from a TOML file, then apply environment overrides.
    ///
    /// - Missing file → file defaults
    /// - Empty file → file defaults
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - `FEEDGATE_*` environment variables override file values
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut settings = Self::load_file(path)?;
        settings.apply_env(|name| std::env::var(name).ok());
        Ok(settings)
    }

    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to prevent memory exhaustion
        // from a corrupted settings file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Settings file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Settings file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Settings file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to warn about unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = [
                "feed_ttl_seconds",
                "config_ttl_seconds",
                "fetch_timeout_seconds",
                "config_url",
                "blog_feed_url",
                "video_feed_url",
                "podcast_feed_url",
            ];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in settings file, ignoring");
                }
            }
        }

        let settings: Settings = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded settings file");
        Ok(settings)
    }

    /// Applies `FEEDGATE_*` overrides from the given lookup. Injectable so
    /// tests don't mutate process environment.
    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        for (name, target) in [
            ("FEEDGATE_CONFIG_URL", &mut self.config_url),
            ("FEEDGATE_BLOG_FEED_URL", &mut self.blog_feed_url),
            ("FEEDGATE_VIDEO_FEED_URL", &mut self.video_feed_url),
            ("FEEDGATE_PODCAST_FEED_URL", &mut self.podcast_feed_url),
        ] {
            if let Some(value) = var(name).filter(|v| !v.trim().is_empty()) {
                *target = Some(value);
            }
        }

        for (name, target) in [
            ("FEEDGATE_FEED_TTL_SECONDS", &mut self.feed_ttl_seconds),
            ("FEEDGATE_CONFIG_TTL_SECONDS", &mut self.config_ttl_seconds),
            (
                "FEEDGATE_FETCH_TIMEOUT_SECONDS",
                &mut self.fetch_timeout_seconds,
            ),
        ] {
            if let Some(raw) = var(name) {
                match raw.parse::<u64>() {
                    Ok(value) => *target = value,
                    Err(_) => {
                        tracing::warn!(var = name, value = %raw, "Ignoring non-numeric override")
                    }
                }
            }
        }
    }

    pub fn feed_ttl(&self) -> Duration {
        Duration::from_secs(self.feed_ttl_seconds)
    }

    pub fn config_ttl(&self) -> Duration {
        Duration::from_secs(self.config_ttl_seconds)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_seconds)
    }

    /// The environment-level default URL for a feed kind.
    pub fn default_feed_url(&self, kind: FeedKind) -> Option<&str> {
        match kind {
            FeedKind::Blog => self.blog_feed_url.as_deref(),
            FeedKind::Video => self.video_feed_url.as_deref(),
            FeedKind::Podcast => self.podcast_feed_url.as_deref(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
