//! Application state for the web layer.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::cache::{CacheError, CacheKey, TrainCache};
use crate::dataset::{PositionSnapshot, TrainDataset};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The file-backed train cache
    pub cache: TrainCache,

    /// The mock dataset handlers recompute from on a miss
    pub dataset: Arc<TrainDataset>,
}

impl AppState {
    /// Create a new app state.
    pub fn new(cache: TrainCache, dataset: Arc<TrainDataset>) -> Self {
        Self { cache, dataset }
    }

    /// Recompute and store every cache key from the dataset.
    ///
    /// Shared by the manual refresh endpoint and the background refresh
    /// loop. Bypasses freshness checks: each key is overwritten with a new
    /// timestamp whether or not the old record had expired.
    pub async fn regenerate_all(&self) -> Result<(), CacheError> {
        let now = Utc::now();

        let trains = self.dataset.trains();
        self.push(CacheKey::Trains, &trains).await?;
        self.push(CacheKey::Stations, &self.dataset.stations()).await?;
        self.push(CacheKey::Status, &self.dataset.status_summary(now))
            .await?;

        let positions: BTreeMap<&str, PositionSnapshot> = trains
            .iter()
            .map(|t| {
                let snapshot = PositionSnapshot::of(t, self.dataset.jittered_position(t), now);
                (t.id.as_str(), snapshot)
            })
            .collect();
        self.push(CacheKey::Positions, &positions).await?;

        Ok(())
    }

    async fn push<T: Serialize>(&self, key: CacheKey, value: &T) -> Result<(), CacheError> {
        let payload = serde_json::to_value(value).map_err(|e| CacheError::Serialize {
            key,
            message: e.to_string(),
        })?;
        self.cache.update(key, payload).await
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tempfile::tempdir;

    use super::*;
    use crate::cache::CacheConfig;

    #[tokio::test]
    async fn regenerate_all_fills_every_key() {
        let dir = tempdir().unwrap();
        let cache =
            TrainCache::new(&CacheConfig::new(dir.path()).with_expiry(Duration::from_secs(30)))
                .unwrap();
        let state = AppState::new(cache, Arc::new(TrainDataset::new()));

        state.regenerate_all().await.unwrap();

        let trains = state.cache.get_if_fresh(CacheKey::Trains).await.unwrap();
        assert_eq!(trains.data.as_array().unwrap().len(), 3);

        let stations = state.cache.get_if_fresh(CacheKey::Stations).await.unwrap();
        assert!(!stations.data.as_array().unwrap().is_empty());

        let status = state.cache.get_if_fresh(CacheKey::Status).await.unwrap();
        assert_eq!(status.data["total_trains"], 3);

        let positions = state.cache.get_if_fresh(CacheKey::Positions).await.unwrap();
        assert!(positions.data.get("IC001").is_some());
    }
}
