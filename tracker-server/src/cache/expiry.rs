//! Freshness judgement for cached records.

use chrono::{DateTime, TimeDelta, Utc};

use super::store::CacheRecord;

/// Decides whether a record is still usable given a fixed window.
///
/// The window is shared by all keys and injected at construction so tests
/// can use small values.
#[derive(Debug, Clone, Copy)]
pub struct ExpiryPolicy {
    window: TimeDelta,
}

impl ExpiryPolicy {
    /// Create a policy with the given freshness window.
    pub fn new(window: std::time::Duration) -> Self {
        let window = TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX);
        Self { window }
    }

    /// The configured window.
    pub fn window(&self) -> TimeDelta {
        self.window
    }

    /// True iff the record was written no more than `window` before `now`.
    pub fn is_fresh(&self, record: &CacheRecord, now: DateTime<Utc>) -> bool {
        self.is_fresh_at(record.last_updated, now)
    }

    /// Freshness judgement on a bare write instant.
    ///
    /// A timestamp ahead of `now` (clock adjustment) counts as fresh.
    pub fn is_fresh_at(&self, last_updated: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last_updated) <= self.window
    }
}
