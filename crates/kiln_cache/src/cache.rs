//! High-level cache orchestrator.
//!
//! `Cache` ties the content-addressed object store and the statistics
//! subsystem together for the compiler wrapper: lookups and stores report
//! into the invocation's counter ledger, and the ledger is flushed through
//! the sharded accounting engine at process exit.

use kiln_common::ContentHash;
use kiln_config::CacheConfig;
use kiln_stats::{CleanupEngine, Counters, Ledger, Shard, StatKind, StatsStore};

use crate::artifact::ArtifactStore;
use crate::error::CacheError;

/// Which lookup strategy produced a cache hit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitKind {
    /// The object was found without running the preprocessor.
    Direct,
    /// The object was found after preprocessing the source.
    Preprocessed,
}

impl HitKind {
    fn stat(self) -> StatKind {
        match self {
            HitKind::Direct => StatKind::HitDirect,
            HitKind::Preprocessed => StatKind::HitPreprocessed,
        }
    }
}

/// The compiler cache: object storage plus usage accounting.
pub struct Cache {
    store: ArtifactStore,
    stats: StatsStore,
    disable_stats: bool,
    kiln_version: String,
}

impl Cache {
    /// Opens the cache described by `config`.
    ///
    /// Nothing is created on disk until an object is stored or counters are
    /// flushed.
    pub fn open(config: &CacheConfig) -> Self {
        Self {
            store: ArtifactStore::new(&config.cache_dir),
            stats: StatsStore::new(&config.cache_dir, config.lock_staleness),
            disable_stats: config.disable_stats,
            kiln_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// The statistics store for this cache.
    pub fn stats(&self) -> &StatsStore {
        &self.stats
    }

    /// Stores a compiled object and records the miss that produced it.
    ///
    /// The file-count and total-size counters move together with the miss,
    /// so the shard's accounting matches what actually landed on disk.
    pub fn store_object(
        &self,
        key: &ContentHash,
        data: &[u8],
        ledger: &mut Ledger,
    ) -> Result<(), CacheError> {
        let stored = self.store.write_object(key, data, &self.kiln_version)?;
        ledger.record_with_size(Some(StatKind::Miss), stored.size_kib, 1);
        Ok(())
    }

    /// Looks up a compiled object, recording a hit on success.
    ///
    /// A missing or invalid object returns `None` without recording
    /// anything: the caller decides which miss or rejection counter the
    /// failure turns into once it knows what it will do next.
    pub fn load_object(
        &self,
        key: &ContentHash,
        kind: HitKind,
        ledger: &mut Ledger,
    ) -> Option<Vec<u8>> {
        let payload = self.store.read_object(key)?;
        ledger.record(kind.stat());
        Some(payload)
    }

    /// Flushes the invocation's ledger into the shard accounting, possibly
    /// triggering cleanup.
    ///
    /// `last_key` is the content hash this invocation computed, if any; its
    /// shard receives the update. Without one the update lands in a
    /// pid-derived shard. A cache opened with `disable_stats` drops the
    /// ledger unflushed.
    pub fn flush(
        &self,
        ledger: Ledger,
        last_key: Option<&ContentHash>,
        cleanup: &dyn CleanupEngine,
    ) -> Result<Option<Counters>, CacheError> {
        if self.disable_stats {
            return Ok(None);
        }
        let shard_hint = last_key.map(Shard::from_key);
        Ok(self.stats.flush(ledger, shard_hint, cleanup)?)
    }
}
