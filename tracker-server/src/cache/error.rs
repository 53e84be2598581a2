//! Cache subsystem error types.

use super::key::CacheKey;

/// Errors from cache persistence.
///
/// Read-path failures are logged at the store boundary and collapsed to a
/// miss; they never reach route handlers as errors. Write failures are
/// returned so the refresh loop can report a failed cycle.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Filesystem operation failed
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Record could not be serialized
    #[error("serialize error for {key}: {message}")]
    Serialize { key: CacheKey, message: String },

    /// Record on disk is corrupt or truncated
    #[error("corrupt record for {key}: {message}")]
    Parse { key: CacheKey, message: String },
}
