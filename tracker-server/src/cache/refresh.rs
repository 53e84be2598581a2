//! Background auto-refresh of every cache key.
//!
//! A single detached task regenerates the whole dataset on a fixed period,
//! independent of read traffic. Readers and the refresh loop only share
//! the store, so neither blocks the other beyond the store's own
//! write atomicity.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::error::CacheError;
use super::facade::TrainCache;

/// Default refresh period: 30 seconds.
pub const DEFAULT_REFRESH_PERIOD: Duration = Duration::from_secs(30);

/// Spawn the recurring regeneration task.
///
/// Each cycle first clears the in-memory write map, so the next freshness
/// check for every key re-derives its age from disk, then awaits
/// `regenerate`, which is expected to `update` every key with fresh
/// payloads.
///
/// A failed cycle is logged and retried on the next tick at the same fixed
/// period; the previous on-disk records are left in place (stale but
/// present). The task never blocks process shutdown.
pub fn spawn_auto_refresh<F, Fut>(
    cache: TrainCache,
    period: Duration,
    regenerate: F,
) -> JoinHandle<()>
where
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), CacheError>> + Send,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await; // First tick is immediate, skip it
        loop {
            interval.tick().await;
            cache.reset_write_times();
            match regenerate().await {
                Ok(()) => debug!("auto-refresh cycle complete"),
                Err(e) => warn!(error = %e, "auto-refresh cycle failed, keeping previous records"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tempfile::tempdir;

    use super::*;
    use crate::cache::key::CacheKey;
    use crate::cache::store::CacheConfig;

    fn cache_with_window(dir: &std::path::Path, window: Duration) -> TrainCache {
        TrainCache::new(&CacheConfig::new(dir).with_expiry(window)).unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn regeneration_replaces_stale_data() {
        let dir = tempdir().unwrap();
        let cache = cache_with_window(dir.path(), Duration::from_millis(500));

        cache
            .update(CacheKey::Trains, serde_json::json!(["X"]))
            .await
            .unwrap();

        let regen_cache = cache.clone();
        let handle = spawn_auto_refresh(cache.clone(), Duration::from_millis(40), move || {
            let cache = regen_cache.clone();
            async move { cache.update(CacheKey::Trains, serde_json::json!(["Y"])).await }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        let record = cache.get_if_fresh(CacheKey::Trains).await.unwrap();
        assert_eq!(record.data, serde_json::json!(["Y"]));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_cycles_keep_previous_records_and_retry() {
        let dir = tempdir().unwrap();
        let cache = cache_with_window(dir.path(), Duration::from_millis(40));

        let payload = serde_json::json!(["X"]);
        cache.update(CacheKey::Trains, payload.clone()).await.unwrap();

        let cycles = Arc::new(AtomicUsize::new(0));
        let counter = cycles.clone();
        let handle = spawn_auto_refresh(cache.clone(), Duration::from_millis(30), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Err(CacheError::Io {
                    message: "upstream unavailable".to_string(),
                })
            }
        });

        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        // The loop kept retrying at the fixed period rather than dying on
        // the first failure.
        assert!(cycles.load(Ordering::SeqCst) >= 2);

        // Past the window the record is absent for readers, but the old
        // data is still on disk for diagnostics.
        assert!(cache.get_if_fresh(CacheKey::Trains).await.is_none());
        let stale = cache.store().read_record(CacheKey::Trains).unwrap().unwrap();
        assert_eq!(stale.data, payload);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cycle_clears_write_map_before_regenerating() {
        let dir = tempdir().unwrap();
        let cache = cache_with_window(dir.path(), Duration::from_secs(30));

        cache.update(CacheKey::Status, serde_json::json!({})).await.unwrap();
        assert!(cache.store().last_write(CacheKey::Status).is_some());

        // A regeneration that never writes leaves the map empty.
        let handle = spawn_auto_refresh(cache.clone(), Duration::from_millis(30), || async {
            Ok(())
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(cache.store().last_write(CacheKey::Status).is_none());
    }
}
