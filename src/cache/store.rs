use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use super::{FlightCache, RefreshError, Snapshot};
use crate::feed::fetcher::fetch_document;
use crate::feed::{parser, CanonicalItem, FeedKind};

/// Snapshot item lists are `Arc`'d: every concurrent request handler holds
/// the same parsed feed, and a clone is a refcount bump.
pub type ItemList = Arc<[CanonicalItem]>;

/// The process-wide feed store: `(FeedKind, feed URL)` → parsed items,
/// with TTL expiry, single-flight refresh, and stale-on-error fallback
/// provided by [`FlightCache`].
///
/// Cheap to clone (clones share the store); constructed once at process
/// start and handed to every request handler.
#[derive(Clone)]
pub struct FeedCache {
    client: reqwest::Client,
    fetch_timeout: Duration,
    inner: FlightCache<(FeedKind, String), ItemList>,
}

impl FeedCache {
    pub fn new(client: reqwest::Client, ttl: Duration, fetch_timeout: Duration) -> Self {
        Self {
            client,
            fetch_timeout,
            inner: FlightCache::new(ttl),
        }
    }

    /// Returns the current snapshot for a feed, refreshing it when the
    /// entry is missing, expired, or `force_refresh` is set.
    ///
    /// An entry's items are always the product of a successful parse: a
    /// failed fetch or parse never overwrites prior items, it degrades to
    /// a [`super::Freshness::Stale`] snapshot. The error only surfaces
    /// when the key was never successfully fetched.
    pub async fn get(
        &self,
        kind: FeedKind,
        url: &str,
        force_refresh: bool,
    ) -> Result<Snapshot<ItemList>, Arc<RefreshError>> {
        let key = (kind, url.to_string());
        let client = self.client.clone();
        let fetch_timeout = self.fetch_timeout;
        let refresh_url = url.to_string();

        self.inner
            .get_with(key, force_refresh, move || async move {
                let doc = fetch_document(&client, &refresh_url, fetch_timeout).await?;
                let items = parser::parse(kind, &doc.bytes, Utc::now())?;
                tracing::debug!(kind = %kind, url = %refresh_url, items = items.len(), "feed refreshed");
                Ok(ItemList::from(items))
            })
            .await
    }
}
