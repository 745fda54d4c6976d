//! Configuration types deserialized from `kiln.toml`.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Default lock staleness bound, in seconds.
///
/// A shard lock older than this is treated as abandoned by a crashed
/// process and may be broken by the next contender.
pub const DEFAULT_LOCK_STALENESS_SECS: u64 = 2;

/// Settings as they appear in `kiln.toml`.
///
/// All fields are optional in the file; a missing file is simply the
/// default configuration.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct FileConfig {
    /// Seconds before a held shard lock is considered abandoned.
    #[serde(default = "default_lock_staleness_secs")]
    pub lock_staleness_secs: u64,

    /// Disable all statistics flushing for processes using this cache.
    #[serde(default)]
    pub disable_stats: bool,
}

fn default_lock_staleness_secs() -> u64 {
    DEFAULT_LOCK_STALENESS_SECS
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            lock_staleness_secs: default_lock_staleness_secs(),
            disable_stats: false,
        }
    }
}

/// Fully-resolved configuration for one invocation.
///
/// Combines the cache directory resolution, the `kiln.toml` contents, and
/// the environment overrides into the values the rest of kiln consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Root directory of the cache.
    pub cache_dir: PathBuf,

    /// How long a shard lock may sit before being breakable.
    pub lock_staleness: Duration,

    /// Whether statistics flushing is disabled.
    pub disable_stats: bool,
}
