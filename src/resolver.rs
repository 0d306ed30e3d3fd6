//! Resolution of the active feed URL per feed kind.
//!
//! A deployment can host a JSON config document next to its content (the
//! portal's dashboard writes it through an external collaborator); each
//! feed URL in that document independently overrides the corresponding
//! environment default. The document itself is fetched through the same
//! TTL + single-flight cache discipline as feed data, keyed by a constant.
//!
//! Resolution never fails: an unreachable or malformed remote document
//! degrades to pure environment defaults and a warning.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::FlightCache;
use crate::config::Settings;
use crate::feed::fetcher::fetch_document;
use crate::feed::FeedKind;

/// Cache key for the remote document — the config source is a single
/// network-fetched document, not a per-feed resource.
const CONFIG_KEY: &str = "config";

/// The resolved feed URLs, after remote/environment merging. A `None`
/// field means that feed kind is unconfigured in this deployment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedConfig {
    pub blog_feed_url: Option<String>,
    pub video_feed_url: Option<String>,
    pub podcast_feed_url: Option<String>,
}

impl FeedConfig {
    pub fn feed_url(&self, kind: FeedKind) -> Option<&str> {
        match kind {
            FeedKind::Blog => self.blog_feed_url.as_deref(),
            FeedKind::Video => self.video_feed_url.as_deref(),
            FeedKind::Podcast => self.podcast_feed_url.as_deref(),
        }
    }
}

/// Shape of the remote document. Only the `feeds` grouping is consumed;
/// other groupings (`seo`, page content) belong to excluded collaborators
/// and are ignored here.
#[derive(Debug, Clone, Default, Deserialize)]
struct RemoteDocument {
    #[serde(default)]
    feeds: RemoteFeeds,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct RemoteFeeds {
    blog: Option<String>,
    video: Option<String>,
    podcast: Option<String>,
}

/// Merges the remotely hosted config document with environment defaults,
/// field by field.
#[derive(Clone)]
pub struct ConfigResolver {
    client: reqwest::Client,
    fetch_timeout: Duration,
    config_url: Option<String>,
    defaults: FeedConfig,
    cache: FlightCache<&'static str, RemoteFeeds>,
}

impl ConfigResolver {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            fetch_timeout: settings.fetch_timeout(),
            config_url: settings.config_url.clone(),
            defaults: FeedConfig {
                blog_feed_url: settings.blog_feed_url.clone(),
                video_feed_url: settings.video_feed_url.clone(),
                podcast_feed_url: settings.podcast_feed_url.clone(),
            },
            cache: FlightCache::new(settings.config_ttl()),
        }
    }

    /// Resolves the active feed configuration.
    ///
    /// Field-level fallback: `remote.field` else `environment default`,
    /// independently per feed kind — a document providing only
    /// `feeds.podcast` leaves blog/video at their defaults.
    pub async fn resolve(&self) -> FeedConfig {
        let remote = self.remote_feeds().await;
        FeedConfig {
            blog_feed_url: remote.blog.or_else(|| self.defaults.blog_feed_url.clone()),
            video_feed_url: remote.video.or_else(|| self.defaults.video_feed_url.clone()),
            podcast_feed_url: remote
                .podcast
                .or_else(|| self.defaults.podcast_feed_url.clone()),
        }
    }

    /// Convenience accessor for a single feed kind.
    pub async fn feed_url(&self, kind: FeedKind) -> Option<String> {
        let config = self.resolve().await;
        match kind {
            FeedKind::Blog => config.blog_feed_url,
            FeedKind::Video => config.video_feed_url,
            FeedKind::Podcast => config.podcast_feed_url,
        }
    }

    async fn remote_feeds(&self) -> RemoteFeeds {
        let Some(url) = self.config_url.clone() else {
            return RemoteFeeds::default();
        };

        let client = self.client.clone();
        let timeout = self.fetch_timeout;
        let fetch_url = url.clone();

        let result = self
            .cache
            .get_with(CONFIG_KEY, false, move || async move {
                let doc = fetch_document(&client, &fetch_url, timeout).await?;
                let parsed: RemoteDocument = serde_json::from_slice(&doc.bytes)?;
                Ok(parsed.feeds)
            })
            .await;

        match result {
            Ok(snapshot) => snapshot.value,
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "config document unavailable, using environment defaults");
                RemoteFeeds::default()
            }
        }
    }
}
