//! Memoization of document loads, keyed by full request URL.
//!
//! Both successful and failed loads are stored. A document's own `expires`
//! takes precedence over the default TTL.

pub mod memory;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::Document;
use crate::error::LoadError;

pub use memory::MemoryCacheStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteCacheStore;

// ============================================================================
// CachedLoad / CacheStore
// ============================================================================

/// Stored outcome of one document load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CachedLoad {
    Loaded { document: Document },
    Failed { error: LoadError },
}

impl CachedLoad {
    pub fn into_result(self) -> Result<Document, LoadError> {
        match self {
            CachedLoad::Loaded { document } => Ok(document),
            CachedLoad::Failed { error } => Err(error),
        }
    }
}

impl From<Result<Document, LoadError>> for CachedLoad {
    fn from(result: Result<Document, LoadError>) -> Self {
        match result {
            Ok(document) => CachedLoad::Loaded { document },
            Err(error) => CachedLoad::Failed { error },
        }
    }
}

/// Key → outcome store with per-entry expiry.
///
/// Must be safe for concurrent use. Stores report their own failures through
/// logging; a failing store behaves like an empty one.
pub trait CacheStore: Send + Sync {
    /// The stored outcome, if present and not expired.
    fn get(&self, key: &str) -> Option<CachedLoad>;

    /// Store `value` for `ttl`. A zero TTL stores an already expired entry.
    fn set(&self, key: &str, value: CachedLoad, ttl: Duration);
}

/// Internal errors of persistent stores.
#[derive(Debug, Error)]
pub enum CacheError {
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache entry encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Absolute expiry for an entry stored at `now` with `ttl`.
pub(crate) fn expiry_after(now: DateTime<Utc>, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

// ============================================================================
// DocumentCache
// ============================================================================

/// Cache layer in front of a loader.
#[derive(Clone)]
pub struct DocumentCache {
    store: Arc<dyn CacheStore>,
    default_ttl: Duration,
}

impl DocumentCache {
    pub fn new(store: Arc<dyn CacheStore>, default_ttl: Duration) -> Self {
        Self { store, default_ttl }
    }

    /// Return the cached outcome for `key`, or run `load` and remember its
    /// outcome.
    ///
    /// Concurrent misses for the same key may both run `load`; the last one
    /// to finish wins.
    pub async fn get_or_load<F, Fut>(&self, key: &str, load: F) -> Result<Document, LoadError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Document, LoadError>>,
    {
        if let Some(hit) = self.store.get(key) {
            tracing::debug!(key, "cache hit");
            return hit.into_result();
        }

        let outcome = load().await;
        let ttl = match &outcome {
            Ok(document) => self.ttl_for(document, Utc::now()),
            Err(_) => self.default_ttl,
        };
        self.store.set(key, CachedLoad::from(outcome.clone()), ttl);
        outcome
    }

    /// TTL for a freshly loaded document: time left until its `expires`,
    /// else the default.
    pub fn ttl_for(&self, document: &Document, now: DateTime<Utc>) -> Duration {
        match document.expires {
            Some(expires) => (expires - now).to_std().unwrap_or(Duration::ZERO),
            None => self.default_ttl,
        }
    }
}

impl std::fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentCache")
            .field("default_ttl", &self.default_ttl)
            .finish_non_exhaustive()
    }
}
