//! Single-item lookups over a cached snapshot.
//!
//! Pure functions: they never trigger I/O and operate on whatever item
//! list the cache currently returns. Lookups are linear scans — a known
//! scaling limit accepted deliberately, since feeds hold tens to low
//! hundreds of items and snapshots are rebuilt wholesale on refresh (an
//! index would be rebuilt just as often as it would be queried).
//!
//! A miss is `None`; the API layer maps it to 404.

use crate::feed::CanonicalItem;

/// Finds an item by slug (posts and podcast episodes carry slugs).
pub fn find_by_slug<'a>(items: &'a [CanonicalItem], slug: &str) -> Option<&'a CanonicalItem> {
    items.iter().find(|item| match item {
        CanonicalItem::Post(p) => p.slug == slug,
        CanonicalItem::Podcast(p) => p.slug == slug,
        CanonicalItem::Video(_) => false,
    })
}

/// Finds a video by its platform id.
pub fn find_by_id<'a>(items: &'a [CanonicalItem], id: &str) -> Option<&'a CanonicalItem> {
    items.iter().find(|item| match item {
        CanonicalItem::Video(v) => v.id == id,
        _ => false,
    })
}

/// Finds a podcast episode by guid or slug, transparently — callers pass
/// whichever identifier they have.
pub fn find_by_guid_or_slug<'a>(items: &'a [CanonicalItem], key: &str) -> Option<&'a CanonicalItem> {
    items.iter().find(|item| match item {
        CanonicalItem::Podcast(p) => p.guid == key || p.slug == key,
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{Podcast, Post, Video};
    use chrono::{TimeZone, Utc};

    fn sample_items() -> Vec<CanonicalItem> {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        vec![
            CanonicalItem::Post(Post {
                slug: "first-post".into(),
                title: "First Post".into(),
                link: "https://blog.example.com/first".into(),
                published_at: at,
                description: "d".into(),
                content: "c".into(),
                image: None,
                author: None,
            }),
            CanonicalItem::Video(Video {
                id: "vid123".into(),
                title: "A Video".into(),
                link: "https://videos.example.com/watch?v=vid123".into(),
                published_at: at,
                description: None,
                thumbnail: None,
            }),
            CanonicalItem::Podcast(Podcast {
                guid: "ep-001".into(),
                slug: "episode-one".into(),
                title: "Episode One".into(),
                link: "https://pod.example.com/ep1".into(),
                published_at: at,
                description: None,
                audio_url: "https://cdn.example.com/ep1.mp3".into(),
            }),
        ]
    }

    #[test]
    fn test_find_by_slug() {
        let items = sample_items();
        let found = find_by_slug(&items, "first-post").unwrap();
        assert_eq!(found.title(), "First Post");
        assert!(find_by_slug(&items, "missing").is_none());
    }

    #[test]
    fn test_find_by_id_matches_videos_only() {
        let items = sample_items();
        let found = find_by_id(&items, "vid123").unwrap();
        assert_eq!(found.title(), "A Video");
        // Slugs don't resolve through the id lookup
        assert!(find_by_id(&items, "first-post").is_none());
    }

    #[test]
    fn test_podcast_resolves_by_guid_and_by_slug() {
        let items = sample_items();
        let by_guid = find_by_guid_or_slug(&items, "ep-001").unwrap();
        let by_slug = find_by_guid_or_slug(&items, "episode-one").unwrap();
        assert_eq!(by_guid.title(), "Episode One");
        assert_eq!(by_guid.link(), by_slug.link());
    }

    #[test]
    fn test_guid_or_slug_ignores_other_kinds() {
        let items = sample_items();
        assert!(find_by_guid_or_slug(&items, "first-post").is_none());
    }
}
