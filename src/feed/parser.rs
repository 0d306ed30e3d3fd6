use chrono::{DateTime, Utc};
use feed_rs::model::Entry;
use sha2::{Digest, Sha256};
use thiserror::Error;
use url::Url;

use crate::feed::sanitize::{clean_html, clean_optional};
use crate::feed::{CanonicalItem, FeedKind, Podcast, Post, Video};
use crate::util::{slugify, SlugDeduper};

/// Errors from whole-document parsing.
///
/// Per-entry problems (missing title/link, no extractable id, no
/// enclosure) are not errors: the entry is skipped with a warning. Only a
/// document that cannot be parsed at the top level is fatal.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed feed document: {0}")]
    Malformed(#[from] feed_rs::parser::ParseFeedError),
}

/// Parses a raw feed document into canonical items for the given kind.
///
/// `fetched_at` doubles as the fallback timestamp for entries whose dates
/// the underlying parser cannot read.
///
/// The returned items are ordered by `published_at` descending (stable:
/// document order preserved for equal timestamps). This ordering is a
/// contract consumed by pagination and "recent N" views.
pub fn parse(
    kind: FeedKind,
    bytes: &[u8],
    fetched_at: DateTime<Utc>,
) -> Result<Vec<CanonicalItem>, ParseError> {
    let feed = feed_rs::parser::parse(bytes)?;

    let mut dedup = SlugDeduper::new();
    let mut items = Vec::with_capacity(feed.entries.len());

    for entry in feed.entries {
        if let Some(item) = canonicalize(kind, entry, fetched_at, &mut dedup) {
            items.push(item);
        }
    }

    items.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
    Ok(items)
}

fn canonicalize(
    kind: FeedKind,
    entry: Entry,
    fetched_at: DateTime<Utc>,
    dedup: &mut SlugDeduper,
) -> Option<CanonicalItem> {
    let title = entry
        .title
        .as_ref()
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty());
    let Some(title) = title else {
        tracing::warn!(kind = %kind, entry_id = %entry.id, "entry missing title, skipping");
        return None;
    };

    let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
        tracing::warn!(kind = %kind, entry_id = %entry.id, "entry missing link, skipping");
        return None;
    };

    let published_at = entry.published.or(entry.updated).unwrap_or(fetched_at);

    match kind {
        FeedKind::Blog => Some(canonicalize_post(entry, title, link, published_at, dedup)),
        FeedKind::Video => canonicalize_video(entry, title, link, published_at),
        FeedKind::Podcast => canonicalize_podcast(entry, title, link, published_at, dedup),
    }
}

fn canonicalize_post(
    entry: Entry,
    title: String,
    link: String,
    published_at: DateTime<Utc>,
    dedup: &mut SlugDeduper,
) -> CanonicalItem {
    let slug = claim_slug(&title, &entry.id, &link, dedup);

    let summary = entry.summary.map(|t| t.content);
    let body = entry.content.and_then(|c| c.body);

    // Body falls back to the summary so a description-only feed still
    // yields renderable content.
    let content = clean_html(body.as_deref().or(summary.as_deref()).unwrap_or(""));
    let description = clean_html(summary.as_deref().unwrap_or(""));

    let image = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();

    let author = entry
        .authors
        .first()
        .map(|p| p.name.trim().to_string())
        .filter(|n| !n.is_empty());

    CanonicalItem::Post(Post {
        slug,
        title,
        link,
        published_at,
        description,
        content,
        image,
        author,
    })
}

fn canonicalize_video(
    entry: Entry,
    title: String,
    link: String,
    published_at: DateTime<Utc>,
) -> Option<CanonicalItem> {
    let Some(id) = extract_video_id(&link, &entry.id) else {
        tracing::warn!(entry_id = %entry.id, link = %link, "no extractable video id, skipping");
        return None;
    };

    let description = entry
        .media
        .iter()
        .find_map(|m| m.description.as_ref().map(|t| t.content.clone()))
        .or(entry.summary.map(|t| t.content));

    let thumbnail = entry
        .media
        .iter()
        .flat_map(|m| m.thumbnails.iter())
        .map(|t| t.image.uri.clone())
        .next();

    Some(CanonicalItem::Video(Video {
        id,
        title,
        link,
        published_at,
        description: clean_optional(description.as_deref()),
        thumbnail,
    }))
}

fn canonicalize_podcast(
    entry: Entry,
    title: String,
    link: String,
    published_at: DateTime<Utc>,
    dedup: &mut SlugDeduper,
) -> Option<CanonicalItem> {
    let Some(audio_url) = extract_audio_url(&entry) else {
        tracing::warn!(entry_id = %entry.id, title = %title, "episode without enclosure, skipping");
        return None;
    };

    let guid = match entry.id.trim() {
        "" => synthesize_guid(&link, &title, published_at),
        id => id.to_string(),
    };

    let slug = claim_slug(&title, &guid, &link, dedup);
    let description = entry.summary.map(|t| t.content);

    Some(CanonicalItem::Podcast(Podcast {
        guid,
        slug,
        title,
        link,
        published_at,
        description: clean_optional(description.as_deref()),
        audio_url,
    }))
}

/// Derives and claims a snapshot-unique slug, falling back from title to
/// entry id to a short content hash when a source slugifies to nothing.
fn claim_slug(title: &str, entry_id: &str, link: &str, dedup: &mut SlugDeduper) -> String {
    let mut base = slugify(title);
    if base.is_empty() {
        base = slugify(entry_id);
    }
    if base.is_empty() {
        base = short_hash(link);
    }
    dedup.claim(&base)
}

/// The upstream platform's video id: the `v` query parameter of the watch
/// link, falling back to the `yt:video:`-prefixed Atom entry id.
fn extract_video_id(link: &str, entry_id: &str) -> Option<String> {
    if let Ok(url) = Url::parse(link) {
        if let Some((_, v)) = url.query_pairs().find(|(k, _)| k == "v") {
            if !v.is_empty() {
                return Some(v.into_owned());
            }
        }
    }

    entry_id
        .strip_prefix("yt:video:")
        .map(str::to_string)
        .filter(|id| !id.is_empty())
}

/// Locates the episode audio across the places feed-rs may surface an RSS
/// enclosure: the content src, an enclosure-rel link, or a media object.
fn extract_audio_url(entry: &Entry) -> Option<String> {
    if let Some(src) = entry.content.as_ref().and_then(|c| c.src.as_ref()) {
        return Some(src.href.clone());
    }

    if let Some(link) = entry
        .links
        .iter()
        .find(|l| l.rel.as_deref() == Some("enclosure"))
    {
        return Some(link.href.clone());
    }

    entry
        .media
        .iter()
        .flat_map(|m| m.content.iter())
        .find_map(|c| c.url.as_ref().map(|u| u.to_string()))
}

/// Stable identifier for entries whose feed omits a guid, from the same
/// inputs a reader would use to recognize the episode.
fn synthesize_guid(link: &str, title: &str, published_at: DateTime<Utc>) -> String {
    let input = format!("{}|{}|{}", link, title, published_at.timestamp());
    let hash = Sha256::digest(input.as_bytes());
    format!("{hash:x}")
}

/// A short, slug-safe content hash used as a last-resort slug base when a
/// source slugifies to nothing. Lowercase hex is already slug-safe.
fn short_hash(input: &str) -> String {
    let hash = Sha256::digest(input.as_bytes());
    format!("{hash:x}")[..12].to_string()
}
