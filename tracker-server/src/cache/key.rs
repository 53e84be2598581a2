//! Cache keys partitioning the persisted dataset.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier for one slice of the cached dataset.
///
/// The key set is closed: keys are never created at runtime. Code that
/// needs every key iterates [`CacheKey::ALL`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CacheKey {
    /// The full train list.
    Trains,

    /// All known station names.
    Stations,

    /// Aggregate system status counters.
    Status,

    /// Live position snapshots, keyed by train id within one blob.
    Positions,
}

/// A cache key name outside the fixed set.
///
/// Requesting an unknown key is a caller or configuration error and is
/// reported loudly, unlike an ordinary cache miss.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown cache key: {0}")]
pub struct UnknownKeyError(pub String);

impl CacheKey {
    /// Every key, in the order used for initialisation, clear-all and
    /// info reporting.
    pub const ALL: [CacheKey; 4] = [
        CacheKey::Trains,
        CacheKey::Stations,
        CacheKey::Status,
        CacheKey::Positions,
    ];

    /// The key's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheKey::Trains => "trains",
            CacheKey::Stations => "stations",
            CacheKey::Status => "status",
            CacheKey::Positions => "positions",
        }
    }

    /// Parse a key name, e.g. from a query parameter.
    pub fn parse(s: &str) -> Result<CacheKey, UnknownKeyError> {
        match s {
            "trains" => Ok(CacheKey::Trains),
            "stations" => Ok(CacheKey::Stations),
            "status" => Ok(CacheKey::Status),
            "positions" => Ok(CacheKey::Positions),
            _ => Err(UnknownKeyError(s.to_string())),
        }
    }

    /// Name of the file backing this key inside the cache directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            CacheKey::Trains => "trains.json",
            CacheKey::Stations => "stations.json",
            CacheKey::Status => "status.json",
            CacheKey::Positions => "positions.json",
        }
    }

    /// Placeholder payload written when a key has no backing record yet,
    /// so readers never need to distinguish "never initialised" from
    /// "empty".
    pub fn empty_payload(&self) -> serde_json::Value {
        match self {
            CacheKey::Trains | CacheKey::Stations => serde_json::Value::Array(Vec::new()),
            CacheKey::Status | CacheKey::Positions => {
                serde_json::Value::Object(serde_json::Map::new())
            }
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
