//! Feed normalization: fetching remote feed documents and converting the
//! three upstream dialects into one canonical item model.
//!
//! The module is organized into three submodules:
//!
//! - [`fetcher`] - Timed, single-attempt HTTP retrieval of raw feed bytes
//! - [`parser`] - Dialect-polymorphic conversion into [`CanonicalItem`]s
//! - [`sanitize`] - HTML sanitization for feed-supplied markup
//!
//! The dialects share almost no behavior beyond the output shape, so each
//! feed kind gets its own canonicalization path selected at the parser
//! boundary rather than a trait hierarchy.

pub mod fetcher;
pub mod parser;
pub mod sanitize;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Which upstream feed a request refers to. Determines the parser dialect
/// and the canonical item shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedKind {
    /// Blog article feed (RSS 2.0).
    Blog,
    /// Video feed (Atom with media extensions).
    Video,
    /// Podcast feed (RSS 2.0 with enclosures).
    Podcast,
}

impl FeedKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FeedKind::Blog => "blog",
            FeedKind::Video => "video",
            FeedKind::Podcast => "podcast",
        }
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A blog article normalized from the RSS article feed.
#[derive(Debug, Clone, Serialize)]
pub struct Post {
    /// Deterministic identifier derived from the title; unique within one
    /// feed snapshot.
    pub slug: String,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    /// Sanitized summary HTML.
    pub description: String,
    /// Sanitized body HTML. Safe to render as trusted markup downstream.
    pub content: String,
    pub image: Option<String>,
    pub author: Option<String>,
}

/// A video normalized from the Atom video feed.
#[derive(Debug, Clone, Serialize)]
pub struct Video {
    /// The upstream platform's video identifier, extracted from the
    /// entry's canonical watch link.
    pub id: String,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub description: Option<String>,
    pub thumbnail: Option<String>,
}

/// A podcast episode normalized from the RSS enclosure feed.
#[derive(Debug, Clone, Serialize)]
pub struct Podcast {
    /// Feed-provided unique identifier (synthesized when the feed omits
    /// one).
    pub guid: String,
    /// Secondary lookup key, derived like [`Post::slug`].
    pub slug: String,
    pub title: String,
    pub link: String,
    pub published_at: DateTime<Utc>,
    pub description: Option<String>,
    pub audio_url: String,
}

/// The normalized, feed-kind-tagged representation all parser dialects
/// converge to.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum CanonicalItem {
    Post(Post),
    Video(Video),
    Podcast(Podcast),
}

impl CanonicalItem {
    pub fn title(&self) -> &str {
        match self {
            CanonicalItem::Post(p) => &p.title,
            CanonicalItem::Video(v) => &v.title,
            CanonicalItem::Podcast(p) => &p.title,
        }
    }

    pub fn link(&self) -> &str {
        match self {
            CanonicalItem::Post(p) => &p.link,
            CanonicalItem::Video(v) => &v.link,
            CanonicalItem::Podcast(p) => &p.link,
        }
    }

    pub fn published_at(&self) -> DateTime<Utc> {
        match self {
            CanonicalItem::Post(p) => p.published_at,
            CanonicalItem::Video(v) => v.published_at,
            CanonicalItem::Podcast(p) => p.published_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_item_serializes_with_kind_tag() {
        let item = CanonicalItem::Video(Video {
            id: "abc123".into(),
            title: "A video".into(),
            link: "https://videos.example.com/watch?v=abc123".into(),
            published_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            description: None,
            thumbnail: None,
        });

        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["kind"], "video");
        assert_eq!(json["id"], "abc123");
    }

    #[test]
    fn test_feed_kind_display() {
        assert_eq!(FeedKind::Blog.to_string(), "blog");
        assert_eq!(FeedKind::Podcast.as_str(), "podcast");
    }
}
