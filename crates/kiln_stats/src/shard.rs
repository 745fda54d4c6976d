//! The 16-way sharded layout of the cache directory.
//!
//! Every cache entry and every counter update lands in exactly one of 16
//! shard directories named by a hex digit, `cache_root/0` through
//! `cache_root/f`. Each shard owns one stats file and is the unit of
//! locking; a top-level `cache_root/stats` aggregate exists only for display.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use kiln_common::ContentHash;

use crate::error::StatsError;

/// File name of the counter file inside each shard (and at the top level).
pub const STATS_FILE_NAME: &str = "stats";

/// One of the 16 hash-bucketed subdivisions of the cache directory.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shard(u8);

impl Shard {
    /// Number of shards the cache is split into.
    pub const COUNT: usize = 16;

    /// Creates a shard from a nibble, or `None` if out of range.
    pub fn new(nibble: u8) -> Option<Self> {
        (nibble < Self::COUNT as u8).then_some(Self(nibble))
    }

    /// Every shard, in directory order (0 through f).
    pub fn all() -> impl Iterator<Item = Shard> {
        (0..Self::COUNT as u8).map(Shard)
    }

    /// The shard a cache entry belongs to: the leading nibble of its hash.
    pub fn from_key(key: &ContentHash) -> Self {
        Self(key.first_nibble())
    }

    /// Derives a shard from a process id.
    ///
    /// Used when an invocation failed before any cache key was computed, so
    /// its counter updates still land somewhere bounded. The pid is hashed
    /// rather than taken modulo 16 directly, since sequentially-spawned
    /// build processes have strongly correlated low pid bits.
    pub fn from_pid(pid: u32) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_64(&pid.to_le_bytes());
        Self((hash % Self::COUNT as u64) as u8)
    }

    /// The shard's nibble value (0–15).
    pub fn nibble(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Shard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}", self.0)
    }
}

/// Maps the logical cache onto its shard directories and carries the
/// parameters of the update protocol.
///
/// Cheap to construct; holds no open files or state beyond the cache root
/// and the lock staleness bound.
pub struct StatsStore {
    cache_dir: PathBuf,
    lock_staleness: Duration,
}

impl StatsStore {
    /// Creates a store over `cache_dir` with the given lock staleness bound.
    pub fn new(cache_dir: impl Into<PathBuf>, lock_staleness: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            lock_staleness,
        }
    }

    /// The cache root directory.
    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// The configured lock staleness bound.
    pub fn lock_staleness(&self) -> Duration {
        self.lock_staleness
    }

    /// The directory of one shard (not created).
    pub fn shard_dir(&self, shard: Shard) -> PathBuf {
        self.cache_dir.join(shard.to_string())
    }

    /// The stats file path for a shard, creating the shard directory (and
    /// the cache root) on demand.
    pub fn shard_stats_path(&self, shard: Shard) -> Result<PathBuf, StatsError> {
        let dir = self.shard_dir(shard);
        std::fs::create_dir_all(&dir).map_err(|e| StatsError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir.join(STATS_FILE_NAME))
    }

    /// The stats file path for a shard without touching the filesystem.
    ///
    /// Read paths use this so that summarizing an empty cache does not
    /// materialize 16 directories.
    pub(crate) fn stats_path_for(&self, shard: Shard) -> PathBuf {
        self.shard_dir(shard).join(STATS_FILE_NAME)
    }

    /// The top-level aggregate stats file.
    ///
    /// Display-only: kiln reads it during `summary` for compatibility with
    /// caches written by older tools, never writes it, and removes it on
    /// `zero`. Per-shard counters are authoritative for enforcement.
    pub fn aggregate_stats_path(&self) -> PathBuf {
        self.cache_dir.join(STATS_FILE_NAME)
    }
}
