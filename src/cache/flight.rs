use std::collections::HashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::time::Instant;

use super::RefreshError;

/// How a snapshot was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Served from a non-expired cache entry; no I/O happened.
    Cached,
    /// The result of a refresh that completed during this call.
    Refreshed,
    /// A previous snapshot served because the refresh attempt failed.
    Stale,
}

/// A cache read result: the value plus enough provenance for callers (and
/// tests) to distinguish "fresh" from "served-stale-due-to-error" without
/// exceptions.
#[derive(Debug, Clone)]
pub struct Snapshot<V> {
    pub value: V,
    pub fetched_at: DateTime<Utc>,
    pub freshness: Freshness,
}

type FlightOutput<V> = Result<(V, DateTime<Utc>), Arc<RefreshError>>;
type Flight<V> = Shared<BoxFuture<'static, FlightOutput<V>>>;

/// A keyed store combining TTL expiry, single-flight refresh coordination,
/// and stale-on-error fallback.
///
/// Explicitly constructed and injectable — no ambient singleton — so tests
/// build isolated instances per case. Clones share the same store.
///
/// Concurrency model:
/// - `entries` is behind an `RwLock`: non-expired reads take a shared
///   lock; only a completed refresh takes the write lock, replacing the
///   whole entry so readers see an old snapshot or a new one, never a mix.
/// - `flights` tracks at most one in-progress refresh per key. Callers
///   finding a flight attach to its [`Shared`] handle instead of starting
///   a duplicate upstream fetch; this holds for forced refreshes too, so
///   concurrent forced refreshes collapse into one upstream call.
/// - The refresh future is spawned: once started it runs to completion
///   even if every caller abandons it, and the result still lands in the
///   cache for whoever asks next.
///
/// Expired entries are never evicted — they are the stale-fallback asset,
/// and the key space is bounded by deployment configuration.
pub struct FlightCache<K, V> {
    inner: Arc<Inner<K, V>>,
}

impl<K, V> Clone for FlightCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<K, V> {
    ttl: Duration,
    entries: RwLock<HashMap<K, CachedEntry<V>>>,
    flights: Mutex<HashMap<K, Flight<V>>>,
}

#[derive(Clone)]
struct CachedEntry<V> {
    value: V,
    fetched_at: DateTime<Utc>,
    /// Monotonic refresh instant; `refreshed + ttl` is the only expiry
    /// signal.
    refreshed: Instant,
}

impl<K, V> FlightCache<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                ttl,
                entries: RwLock::new(HashMap::new()),
                flights: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Returns a snapshot for `key`, refreshing through `refresh` when
    /// needed.
    ///
    /// - A non-expired entry is returned immediately unless `force` is
    ///   set.
    /// - Otherwise the caller joins the key's in-flight refresh, or starts
    ///   one. `force` bypasses the freshness check but still participates
    ///   in single-flight coordination: it only starts a new fetch
    ///   generation when no flight exists.
    /// - A failed refresh degrades to the previous snapshot (even an
    ///   expired one) with [`Freshness::Stale`]; the error only propagates
    ///   when the key has no history.
    pub async fn get_with<F, Fut>(
        &self,
        key: K,
        force: bool,
        refresh: F,
    ) -> Result<Snapshot<V>, Arc<RefreshError>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, RefreshError>> + Send + 'static,
    {
        if !force {
            if let Some(entry) = self.inner.fresh(&key) {
                return Ok(Snapshot {
                    value: entry.value,
                    fetched_at: entry.fetched_at,
                    freshness: Freshness::Cached,
                });
            }
        }

        let flight = Arc::clone(&self.inner).join_or_begin(key.clone(), force, refresh);

        match flight.await {
            Ok((value, fetched_at)) => Ok(Snapshot {
                value,
                fetched_at,
                freshness: Freshness::Refreshed,
            }),
            Err(err) => match self.inner.any(&key) {
                Some(entry) => {
                    tracing::warn!(key = ?key, error = %err, "refresh failed, serving stale snapshot");
                    Ok(Snapshot {
                        value: entry.value,
                        fetched_at: entry.fetched_at,
                        freshness: Freshness::Stale,
                    })
                }
                None => Err(err),
            },
        }
    }
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn fresh(&self, key: &K) -> Option<CachedEntry<V>> {
        let entries = read_lock(&self.entries);
        entries
            .get(key)
            .filter(|e| e.refreshed.elapsed() < self.ttl)
            .cloned()
    }

    fn any(&self, key: &K) -> Option<CachedEntry<V>> {
        read_lock(&self.entries).get(key).cloned()
    }

    fn join_or_begin<F, Fut>(self: Arc<Self>, key: K, force: bool, refresh: F) -> Flight<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, RefreshError>> + Send + 'static,
    {
        let mut flights = lock(&self.flights);

        // Late arrivals join whichever fetch is currently in flight,
        // forced or not.
        if let Some(existing) = flights.get(&key) {
            return existing.clone();
        }

        // A refresh may have completed between the caller's freshness
        // check and this lock; don't start a redundant generation.
        if !force {
            if let Some(entry) = self.fresh(&key) {
                return futures::future::ready(Ok((entry.value, entry.fetched_at)))
                    .boxed()
                    .shared();
            }
        }

        let fut = refresh();
        let inner = Arc::clone(&self);
        let task_key = key.clone();
        let task = tokio::spawn(async move {
            let result = fut.await;
            inner.complete(&task_key, result)
        });

        let flight: Flight<V> = async move {
            match task.await {
                Ok(output) => output,
                Err(join_err) => Err(Arc::new(RefreshError::Aborted(join_err.to_string()))),
            }
        }
        .boxed()
        .shared();

        flights.insert(key, flight.clone());
        flight
    }

    fn complete(&self, key: &K, result: Result<V, RefreshError>) -> FlightOutput<V> {
        let output = match result {
            Ok(value) => {
                let fetched_at = Utc::now();
                let entry = CachedEntry {
                    value: value.clone(),
                    fetched_at,
                    refreshed: Instant::now(),
                };
                write_lock(&self.entries).insert(key.clone(), entry);
                Ok((value, fetched_at))
            }
            Err(err) => Err(Arc::new(err)),
        };

        // The entry is already visible, so no caller can observe "no
        // entry and no flight" for a key that just refreshed.
        lock(&self.flights).remove(key);
        output
    }
}

// Lock poisoning only occurs after a panic inside a critical section;
// the data is a plain map, so recovering the guard is always sound.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read_lock<T>(rwlock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    rwlock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_lock<T>(rwlock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    rwlock.write().unwrap_or_else(PoisonError::into_inner)
}
