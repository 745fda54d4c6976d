//! Error types for cache operations.

use std::path::PathBuf;

/// Errors that can occur while storing or flushing cache state.
///
/// Reads are fail-safe and never produce these: a missing, corrupt, or
/// version-skewed object is a cache miss. Errors are reserved for writes
/// that must not be silently lost.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// An I/O error occurred while writing a cache file.
    #[error("cache I/O error at {path}: {source}")]
    Io {
        /// The path that caused the error.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The artifact header could not be serialized.
    #[error("serialization error: {reason}")]
    Serialization {
        /// Description of the serialization failure.
        reason: String,
    },

    /// The statistics subsystem failed while flushing counters.
    #[error(transparent)]
    Stats(#[from] kiln_stats::StatsError),
}
