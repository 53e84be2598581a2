//! The cache surface consumed by route handlers.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use super::error::CacheError;
use super::expiry::ExpiryPolicy;
use super::key::CacheKey;
use super::store::{CacheConfig, CacheRecord, CacheStore};

/// Introspection snapshot for one key.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntryInfo {
    /// Write instant of the on-disk record, if one is readable.
    pub last_updated: Option<DateTime<Utc>>,

    /// Whether a backing file exists.
    pub exists: bool,

    /// Size of the backing file, 0 if absent.
    pub size_bytes: u64,
}

/// Facade over the file-backed store plus the expiry policy.
///
/// All methods are async: the store does blocking file I/O, which is moved
/// off the runtime's worker threads with `spawn_blocking`. Clones share
/// the same store.
#[derive(Clone)]
pub struct TrainCache {
    store: Arc<CacheStore>,
    policy: ExpiryPolicy,
}

impl TrainCache {
    /// Create the cache, initialising the store (and its placeholder
    /// records) from `config`.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        Ok(Self {
            store: Arc::new(CacheStore::new(config)?),
            policy: ExpiryPolicy::new(config.expiry),
        })
    }

    /// Direct store access, for diagnostics that need to see records the
    /// freshness check would hide.
    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// The expiry policy in force.
    pub fn policy(&self) -> ExpiryPolicy {
        self.policy
    }

    /// Load the record for `key` if it is still fresh.
    ///
    /// A known-stale in-memory write instant short-circuits without a disk
    /// read. Stale records are not deleted: they stay on disk until
    /// overwritten, so a refresh in progress never creates an absent gap
    /// for diagnostics. Callers fall back to recomputation on `None`.
    pub async fn get_if_fresh(&self, key: CacheKey) -> Option<CacheRecord> {
        let store = self.store.clone();
        let policy = self.policy;
        run_blocking(move || {
            let now = Utc::now();
            if let Some(last) = store.last_write(key) {
                if !policy.is_fresh_at(last, now) {
                    return None;
                }
            }
            let record = store.read(key)?;
            policy.is_fresh(&record, now).then_some(record)
        })
        .await
        .unwrap_or_else(|| {
            warn!(%key, "cache read task failed");
            None
        })
    }

    /// Persist `payload` under `key`, visible to every subsequent
    /// `get_if_fresh` for the length of the window.
    pub async fn update(&self, key: CacheKey, payload: serde_json::Value) -> Result<(), CacheError> {
        let store = self.store.clone();
        run_blocking(move || store.write(key, payload))
            .await
            .unwrap_or_else(|| {
                Err(CacheError::Io {
                    message: "cache write task failed".to_string(),
                })
            })
    }

    /// Remove one key's record, or every record when `key` is `None`.
    ///
    /// Also resets the affected in-memory write instants, so the next
    /// freshness check re-reads from disk.
    pub async fn clear(&self, key: Option<CacheKey>) -> Result<(), CacheError> {
        let store = self.store.clone();
        run_blocking(move || match key {
            Some(key) => store.delete(key),
            None => store.delete_all(),
        })
        .await
        .unwrap_or_else(|| {
            Err(CacheError::Io {
                message: "cache clear task failed".to_string(),
            })
        })
    }

    /// Snapshot of every key's on-disk state, computed fresh per call.
    pub async fn info(&self) -> BTreeMap<CacheKey, CacheEntryInfo> {
        let store = self.store.clone();
        run_blocking(move || {
            CacheKey::ALL
                .into_iter()
                .map(|key| {
                    let record = store.read(key);
                    let info = CacheEntryInfo {
                        last_updated: record.map(|r| r.last_updated),
                        exists: store.exists(key),
                        size_bytes: store.size_bytes(key),
                    };
                    (key, info)
                })
                .collect()
        })
        .await
        .unwrap_or_else(|| {
            warn!("cache info task failed");
            BTreeMap::new()
        })
    }

    /// Write instant of the on-disk record for `key`, if readable.
    ///
    /// Surfaces staleness to API responses; absent means no record (or an
    /// unreadable one).
    pub async fn get_last_update_time(&self, key: CacheKey) -> Option<DateTime<Utc>> {
        let store = self.store.clone();
        run_blocking(move || store.read(key).map(|r| r.last_updated))
            .await
            .flatten()
    }

    /// Forget every in-memory write instant; the refresh loop calls this
    /// at the start of each cycle. On-disk records are untouched.
    pub fn reset_write_times(&self) {
        self.store.reset_write_times();
    }
}

/// Run blocking file I/O off the async runtime.
///
/// `None` means the blocking task itself failed (panicked); callers treat
/// that like any other I/O failure.
async fn run_blocking<T, F>(f: F) -> Option<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.ok()
}
