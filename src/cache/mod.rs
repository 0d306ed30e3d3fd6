//! Process-wide feed caching.
//!
//! Split into two layers:
//!
//! - [`flight`] - A generic keyed store combining TTL expiry, single-flight
//!   refresh coordination, and stale-on-error fallback. The config resolver
//!   reuses this directly for the remote config document.
//! - [`store`] - [`FeedCache`], the `(FeedKind, URL)`-keyed facade that
//!   plugs the HTTP fetcher and feed parser into the generic layer.
//!
//! The store is created empty at process start, holds no durable state,
//! and is discarded wholesale when the process instance is retired.

mod flight;
mod store;

pub use flight::{FlightCache, Freshness, Snapshot};
pub use store::{FeedCache, ItemList};

use thiserror::Error;

use crate::feed::fetcher::FetchError;
use crate::feed::parser::ParseError;

/// Why a refresh attempt failed.
///
/// Shared between every caller waiting on the same single-flight refresh,
/// hence handed out as `Arc<RefreshError>`. Callers normally never see one
/// unless the key has no prior successful snapshot: a failed refresh with
/// history degrades to a stale snapshot instead.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid config document: {0}")]
    InvalidConfig(#[from] serde_json::Error),
    /// The spawned refresh task was cancelled or panicked.
    #[error("refresh task aborted: {0}")]
    Aborted(String),
}
