//! File-backed persistence for cache records.
//!
//! One JSON document per cache key. Writes go to a unique temp file in the
//! same directory and are renamed over the destination, so a concurrent
//! reader sees either the old record or the new one, never a partial mix.
//! Concurrent writes to the same key are whole-file last-write-wins.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::CacheError;
use super::key::CacheKey;

/// Default freshness window: 30 seconds.
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(30);

/// Counter for unique temp-file names, so concurrent writers to the same
/// key never share a scratch file.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One persisted cache record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// The cached payload; shape depends on the key.
    pub data: serde_json::Value,

    /// When the record was written, as an RFC 3339 string on disk.
    /// A record whose timestamp fails to parse fails deserialization
    /// entirely and is treated as absent.
    pub last_updated: DateTime<Utc>,

    /// Always true once written.
    pub success: bool,

    /// Echo of the key the record belongs to.
    pub cache_type: CacheKey,
}

/// Configuration for the cache store.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding one JSON file per key.
    pub dir: PathBuf,

    /// How long a record stays fresh.
    pub expiry: Duration,
}

impl CacheConfig {
    /// Create a config with the given directory and the default window.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            expiry: DEFAULT_EXPIRY,
        }
    }

    /// Set a custom freshness window.
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new("cache")
    }
}

/// File-backed store for all cache keys.
///
/// Exclusively owns its directory; no other component touches the files.
/// Alongside the files it keeps the last successful write instant per key
/// in memory, so freshness checks can skip a disk read for known-stale
/// keys. That map is transient: the refresh loop clears it each cycle and
/// it is rebuilt lazily from disk reads.
#[derive(Debug)]
pub struct CacheStore {
    dir: PathBuf,
    write_times: Mutex<HashMap<CacheKey, DateTime<Utc>>>,
}

impl CacheStore {
    /// Create the store, its directory, and a placeholder record for every
    /// key that has no backing file yet.
    pub fn new(config: &CacheConfig) -> Result<Self, CacheError> {
        fs::create_dir_all(&config.dir).map_err(|e| CacheError::Io {
            message: format!("failed to create cache directory {:?}: {e}", config.dir),
        })?;

        let store = Self {
            dir: config.dir.clone(),
            write_times: Mutex::new(HashMap::new()),
        };

        for key in CacheKey::ALL {
            if !store.exists(key) {
                store.write(key, key.empty_payload())?;
            }
        }

        Ok(store)
    }

    /// Path of the file backing `key`.
    pub fn path(&self, key: CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }

    /// Load the record for `key`, collapsing every failure to absent.
    ///
    /// Missing files, I/O errors and corrupt JSON are all logged here and
    /// reported to the caller as a plain miss.
    pub fn read(&self, key: CacheKey) -> Option<CacheRecord> {
        match self.read_record(key) {
            Ok(Some(record)) => {
                // Rebuild the transient write map from disk when it has
                // no entry for this key (e.g. after a forced refresh).
                let mut times = lock_unpoisoned(&self.write_times);
                times.entry(key).or_insert(record.last_updated);
                Some(record)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(%key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Load the record for `key` with failures intact.
    ///
    /// Diagnostics use this to inspect records that `read` would hide;
    /// everything else should go through `read`.
    pub fn read_record(&self, key: CacheKey) -> Result<Option<CacheRecord>, CacheError> {
        let path = self.path(key);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(CacheError::Io {
                    message: format!("failed to read {path:?}: {e}"),
                });
            }
        };

        let record = serde_json::from_str(&contents).map_err(|e| CacheError::Parse {
            key,
            message: e.to_string(),
        })?;

        Ok(Some(record))
    }

    /// Persist `payload` under `key`, stamping the current time.
    ///
    /// Fully overwrites any prior record. The write lands in a unique temp
    /// file first and is renamed into place, keeping the record atomic for
    /// concurrent readers. On success the in-memory write instant for the
    /// key is advanced.
    pub fn write(&self, key: CacheKey, payload: serde_json::Value) -> Result<(), CacheError> {
        let record = CacheRecord {
            data: payload,
            last_updated: Utc::now(),
            success: true,
            cache_type: key,
        };

        let json = serde_json::to_string_pretty(&record).map_err(|e| CacheError::Serialize {
            key,
            message: e.to_string(),
        })?;

        let path = self.path(key);
        let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let tmp = self.dir.join(format!(".{}.{seq}.tmp", key.file_name()));

        fs::write(&tmp, json).map_err(|e| CacheError::Io {
            message: format!("failed to write {tmp:?}: {e}"),
        })?;

        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(CacheError::Io {
                message: format!("failed to replace {path:?}: {e}"),
            });
        }

        let mut times = lock_unpoisoned(&self.write_times);
        times.insert(key, record.last_updated);
        debug!(%key, "cache record written");

        Ok(())
    }

    /// Remove the record for `key`. Absent is not an error.
    pub fn delete(&self, key: CacheKey) -> Result<(), CacheError> {
        let path = self.path(key);
        match fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(CacheError::Io {
                    message: format!("failed to delete {path:?}: {e}"),
                });
            }
        }

        let mut times = lock_unpoisoned(&self.write_times);
        times.remove(&key);
        debug!(%key, "cache record deleted");

        Ok(())
    }

    /// Remove the records for all known keys. Idempotent.
    pub fn delete_all(&self) -> Result<(), CacheError> {
        for key in CacheKey::ALL {
            self.delete(key)?;
        }
        Ok(())
    }

    /// Whether a backing file exists for `key`. Introspection only.
    pub fn exists(&self, key: CacheKey) -> bool {
        self.path(key).exists()
    }

    /// Size of the backing file in bytes, 0 if absent. Introspection only.
    pub fn size_bytes(&self, key: CacheKey) -> u64 {
        fs::metadata(self.path(key)).map(|m| m.len()).unwrap_or(0)
    }

    /// Last in-memory write instant for `key`, if known.
    pub fn last_write(&self, key: CacheKey) -> Option<DateTime<Utc>> {
        lock_unpoisoned(&self.write_times).get(&key).copied()
    }

    /// Forget every in-memory write instant.
    ///
    /// Does not touch the on-disk records. The next freshness check for
    /// each key re-derives its age from the file itself.
    pub fn reset_write_times(&self) {
        lock_unpoisoned(&self.write_times).clear();
    }

    /// The cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::tempdir;

    use super::*;

    fn store_in(dir: &Path) -> CacheStore {
        CacheStore::new(&CacheConfig::new(dir)).unwrap()
    }

    #[test]
    fn construction_writes_placeholders_for_every_key() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        for key in CacheKey::ALL {
            assert!(store.exists(key), "missing placeholder for {key}");
            let record = store.read(key).unwrap();
            assert_eq!(record.data, key.empty_payload());
            assert!(record.success);
            assert_eq!(record.cache_type, key);
        }
    }

    #[test]
    fn construction_preserves_existing_records() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .write(CacheKey::Trains, serde_json::json!(["IC001"]))
            .unwrap();

        // A second store over the same directory must not reset the data.
        let reopened = store_in(dir.path());
        let record = reopened.read(CacheKey::Trains).unwrap();
        assert_eq!(record.data, serde_json::json!(["IC001"]));
    }

    #[test]
    fn write_read_round_trip() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let payload = serde_json::json!([{"id": "IC001", "delay_minutes": 5}]);
        store.write(CacheKey::Trains, payload.clone()).unwrap();

        let record = store.read(CacheKey::Trains).unwrap();
        assert_eq!(record.data, payload);
        assert_eq!(record.cache_type, CacheKey::Trains);
    }

    #[test]
    fn write_advances_last_updated() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.write(CacheKey::Status, serde_json::json!({})).unwrap();
        let first = store.read(CacheKey::Status).unwrap().last_updated;

        store.write(CacheKey::Status, serde_json::json!({})).unwrap();
        let second = store.read(CacheKey::Status).unwrap().last_updated;

        assert!(second >= first);
    }

    #[test]
    fn corrupt_file_reads_as_miss_but_error_is_inspectable() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        fs::write(store.path(CacheKey::Trains), "{ not json").unwrap();

        assert!(store.read(CacheKey::Trains).is_none());
        assert!(matches!(
            store.read_record(CacheKey::Trains),
            Err(CacheError::Parse { key: CacheKey::Trains, .. })
        ));
    }

    #[test]
    fn unparseable_timestamp_reads_as_miss() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        let doc = r#"{"data": [], "last_updated": "not-a-time", "success": true, "cache_type": "trains"}"#;
        fs::write(store.path(CacheKey::Trains), doc).unwrap();

        assert!(store.read(CacheKey::Trains).is_none());
    }

    #[test]
    fn delete_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.delete(CacheKey::Trains).unwrap();
        assert!(!store.exists(CacheKey::Trains));
        assert!(store.read(CacheKey::Trains).is_none());

        // Deleting again is fine.
        store.delete(CacheKey::Trains).unwrap();
    }

    #[test]
    fn delete_all_removes_every_key() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.delete_all().unwrap();
        for key in CacheKey::ALL {
            assert!(!store.exists(key));
            assert_eq!(store.size_bytes(key), 0);
        }
    }

    #[test]
    fn size_bytes_reflects_file_contents() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        assert!(store.size_bytes(CacheKey::Trains) > 0);
        store.delete(CacheKey::Trains).unwrap();
        assert_eq!(store.size_bytes(CacheKey::Trains), 0);
    }

    #[test]
    fn write_tracks_last_write_instant() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.reset_write_times();
        assert!(store.last_write(CacheKey::Trains).is_none());

        store.write(CacheKey::Trains, serde_json::json!([])).unwrap();
        assert!(store.last_write(CacheKey::Trains).is_some());
    }

    #[test]
    fn read_rebuilds_write_map_lazily() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path());

        store.reset_write_times();
        assert!(store.last_write(CacheKey::Stations).is_none());

        let record = store.read(CacheKey::Stations).unwrap();
        assert_eq!(store.last_write(CacheKey::Stations), Some(record.last_updated));
    }

    #[test]
    fn concurrent_writes_never_interleave() {
        let dir = tempdir().unwrap();
        let store = Arc::new(store_in(dir.path()));

        let payload_a = serde_json::json!(vec!["a"; 500]);
        let payload_b = serde_json::json!(vec!["b"; 500]);

        for _ in 0..20 {
            let (sa, sb) = (store.clone(), store.clone());
            let (pa, pb) = (payload_a.clone(), payload_b.clone());
            let ta = std::thread::spawn(move || sa.write(CacheKey::Trains, pa).unwrap());
            let tb = std::thread::spawn(move || sb.write(CacheKey::Trains, pb).unwrap());
            ta.join().unwrap();
            tb.join().unwrap();

            let record = store.read(CacheKey::Trains).unwrap();
            assert!(
                record.data == payload_a || record.data == payload_b,
                "record is a corrupted merge of both writes"
            );
        }
    }
}
