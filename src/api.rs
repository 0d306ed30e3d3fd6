//! JSON API over the feed cache.
//!
//! Thin request/response wrappers: every handler resolves the active feed
//! URL, reads the cache, and maps outcomes to status codes. Detailed page
//! rendering, auth, and the dashboard live in external collaborators.
//!
//! Status mapping:
//! - upstream unavailable with no cached snapshot → 502
//! - unknown identifier → 404
//! - feed kind unconfigured in this deployment → 503

use actix_web::{get, web, HttpResponse, Responder};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{FeedCache, Freshness, ItemList, Snapshot};
use crate::feed::{CanonicalItem, FeedKind};
use crate::lookup;
use crate::resolver::ConfigResolver;

/// Shared application state, one instance per process, cloned into
/// workers by actix.
pub struct AppState {
    pub cache: FeedCache,
    pub resolver: ConfigResolver,
}

/// Query parameters accepted by list endpoints.
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub offset: usize,
    pub limit: Option<usize>,
    /// Bypass the freshness check (still coalesced by single-flight).
    #[serde(default)]
    pub refresh: bool,
}

#[derive(Serialize)]
struct ListResponse<'a> {
    kind: FeedKind,
    total: usize,
    offset: usize,
    /// True when this snapshot was served because a refresh failed.
    stale: bool,
    fetched_at: DateTime<Utc>,
    items: &'a [CanonicalItem],
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_posts)
        .service(get_post)
        .service(list_videos)
        .service(get_video)
        .service(list_podcasts)
        .service(get_podcast);
}

#[get("/api/posts")]
async fn list_posts(state: web::Data<AppState>, query: web::Query<ListQuery>) -> impl Responder {
    list_response(&state, FeedKind::Blog, query.into_inner()).await
}

#[get("/api/posts/{slug}")]
async fn get_post(state: web::Data<AppState>, slug: web::Path<String>) -> impl Responder {
    item_response(&state, FeedKind::Blog, |items| {
        lookup::find_by_slug(items, &slug).cloned()
    })
    .await
}

#[get("/api/videos")]
async fn list_videos(state: web::Data<AppState>, query: web::Query<ListQuery>) -> impl Responder {
    list_response(&state, FeedKind::Video, query.into_inner()).await
}

#[get("/api/videos/{id}")]
async fn get_video(state: web::Data<AppState>, id: web::Path<String>) -> impl Responder {
    item_response(&state, FeedKind::Video, |items| {
        lookup::find_by_id(items, &id).cloned()
    })
    .await
}

#[get("/api/podcasts")]
async fn list_podcasts(state: web::Data<AppState>, query: web::Query<ListQuery>) -> impl Responder {
    list_response(&state, FeedKind::Podcast, query.into_inner()).await
}

/// Podcast items resolve by guid or slug transparently.
#[get("/api/podcasts/{key}")]
async fn get_podcast(state: web::Data<AppState>, key: web::Path<String>) -> impl Responder {
    item_response(&state, FeedKind::Podcast, |items| {
        lookup::find_by_guid_or_slug(items, &key).cloned()
    })
    .await
}

async fn list_response(state: &AppState, kind: FeedKind, query: ListQuery) -> HttpResponse {
    let snapshot = match load_snapshot(state, kind, query.refresh).await {
        Ok(snapshot) => snapshot,
        Err(response) => return response,
    };

    let items = &snapshot.value;
    let total = items.len();
    let offset = query.offset.min(total);
    let end = match query.limit {
        Some(limit) => offset.saturating_add(limit).min(total),
        None => total,
    };

    HttpResponse::Ok().json(ListResponse {
        kind,
        total,
        offset,
        stale: snapshot.freshness == Freshness::Stale,
        fetched_at: snapshot.fetched_at,
        items: &items[offset..end],
    })
}

async fn item_response<F>(state: &AppState, kind: FeedKind, find: F) -> HttpResponse
where
    F: FnOnce(&[CanonicalItem]) -> Option<CanonicalItem>,
{
    let snapshot = match load_snapshot(state, kind, false).await {
        Ok(snapshot) => snapshot,
        Err(response) => return response,
    };

    match find(&snapshot.value) {
        Some(item) => HttpResponse::Ok().json(item),
        None => HttpResponse::NotFound().json(ErrorBody { error: "not found" }),
    }
}

async fn load_snapshot(
    state: &AppState,
    kind: FeedKind,
    refresh: bool,
) -> Result<Snapshot<ItemList>, HttpResponse> {
    let Some(url) = state.resolver.feed_url(kind).await else {
        return Err(HttpResponse::ServiceUnavailable().json(ErrorBody {
            error: "feed not configured",
        }));
    };

    state.cache.get(kind, &url, refresh).await.map_err(|err| {
        tracing::error!(kind = %kind, error = %err, "feed unavailable with no cached snapshot");
        HttpResponse::BadGateway().json(ErrorBody {
            error: "upstream feed unavailable",
        })
    })
}
