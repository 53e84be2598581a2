//! Time-expiring, file-backed cache for the train dataset.
//!
//! One JSON record per cache key, persisted in a single directory that the
//! store exclusively owns. Handlers go through [`TrainCache`]: a fresh hit
//! serves the record, a miss (absent, stale, or unreadable) makes the
//! handler recompute and push the result back with `update`. A background
//! task regenerates every key on a fixed period regardless of traffic.

mod error;
mod expiry;
mod facade;
mod key;
mod refresh;
mod store;

pub use error::CacheError;
pub use expiry::ExpiryPolicy;
pub use facade::{CacheEntryInfo, TrainCache};
pub use key::{CacheKey, UnknownKeyError};
pub use refresh::{DEFAULT_REFRESH_PERIOD, spawn_auto_refresh};
pub use store::{CacheConfig, CacheRecord, CacheStore, DEFAULT_EXPIRY};
