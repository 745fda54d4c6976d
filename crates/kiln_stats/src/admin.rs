//! Administrative operations over the whole cache.
//!
//! Each of these walks the 16 shards as a sequence of independent,
//! locally-atomic per-shard operations — there is no cache-wide lock. A
//! shard whose lock cannot be acquired is skipped and the rest proceed; a
//! summary computed while another process is updating may mix pre- and
//! post-update shards. Both are accepted.

use std::path::{Path, PathBuf};

use crate::codec::{decode, read_counters, write_counters_atomic};
use crate::counter::{Counters, StatKind, STAT_INFO};
use crate::error::StatsError;
use crate::lock::LockFile;
use crate::shard::{Shard, StatsStore, STATS_FILE_NAME};

/// Aggregated counters for display.
#[derive(Debug)]
pub struct Summary {
    /// The cache root the summary describes.
    pub cache_dir: PathBuf,
    /// Counters summed across the aggregate file and all 16 shards.
    pub counters: Counters,
}

impl StatsStore {
    /// Sums counters across all 16 shards plus the legacy aggregate file.
    ///
    /// Takes no locks. Each missing shard contributes the default vector,
    /// so an empty cache reports the built-in total size quota. The
    /// top-level aggregate is display-only legacy data: it is read without
    /// default seeding and its configured maxima are suppressed before
    /// summing, since the per-shard values are authoritative for those.
    pub fn summary(&self) -> Summary {
        let mut total = Counters::zeroed();

        if let Ok(text) = std::fs::read_to_string(self.aggregate_stats_path()) {
            let mut aggregate = decode(&text);
            aggregate[StatKind::MaxFiles] = 0;
            aggregate[StatKind::MaxSizeKib] = 0;
            total.merge(&aggregate);
        }

        for shard in Shard::all() {
            total.merge(&read_counters(&self.stats_path_for(shard)));
        }

        Summary {
            cache_dir: self.cache_dir().to_path_buf(),
            counters: total,
        }
    }

    /// Resets every counter not flagged `never_reset` in all 16 shards and
    /// removes the aggregate display file.
    ///
    /// The configured limits (max files, max size) retain their values.
    /// Shards whose lock cannot be acquired are skipped; a shard directory
    /// that does not exist is left alone.
    pub fn zero(&self) -> Result<(), StatsError> {
        let aggregate = self.aggregate_stats_path();
        match std::fs::remove_file(&aggregate) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(StatsError::RemoveFile {
                    path: aggregate,
                    source: e,
                })
            }
        }

        for shard in Shard::all() {
            let path = self.stats_path_for(shard);
            let Some(_guard) = LockFile::acquire(&path, self.lock_staleness()) else {
                continue;
            };
            let mut counters = read_counters(&path);
            for info in &STAT_INFO {
                if !info.never_reset {
                    counters[info.kind] = 0;
                }
            }
            write_counters_atomic(&path, &counters)?;
        }
        Ok(())
    }

    /// Writes new per-shard limits, dividing each given global maximum
    /// evenly across the 16 shards.
    ///
    /// `None` leaves a dimension untouched; an explicit 0 writes 0, meaning
    /// "no limit". Shard directories are created as needed, and a directory
    /// creation failure fails the whole call — limits must be applied
    /// cache-wide to be meaningful. Lock-contended shards are skipped.
    pub fn set_limits(
        &self,
        max_files: Option<u64>,
        max_size_kib: Option<u64>,
    ) -> Result<(), StatsError> {
        let per_shard_files = max_files.map(|v| v / Shard::COUNT as u64);
        let per_shard_size = max_size_kib.map(|v| v / Shard::COUNT as u64);

        for shard in Shard::all() {
            let path = self.shard_stats_path(shard)?;
            let Some(_guard) = LockFile::acquire(&path, self.lock_staleness()) else {
                continue;
            };
            let mut counters = read_counters(&path);
            if let Some(v) = per_shard_files {
                counters[StatKind::MaxFiles] = v;
            }
            if let Some(v) = per_shard_size {
                counters[StatKind::MaxSizeKib] = v;
            }
            write_counters_atomic(&path, &counters)?;
        }
        Ok(())
    }

    /// Overwrites (not adds) the file-count and total-size counters of one
    /// shard directory.
    ///
    /// Rebuild/recovery tooling uses this after scanning a shard's actual
    /// contents. Creates the directory if needed; silently skips on lock
    /// contention like any other single-shard operation.
    pub fn set_sizes(
        &self,
        shard_dir: &Path,
        num_files: u64,
        total_size_kib: u64,
    ) -> Result<(), StatsError> {
        std::fs::create_dir_all(shard_dir).map_err(|e| StatsError::CreateDir {
            path: shard_dir.to_path_buf(),
            source: e,
        })?;
        let path = shard_dir.join(STATS_FILE_NAME);
        let Some(_guard) = LockFile::acquire(&path, self.lock_staleness()) else {
            return Ok(());
        };
        let mut counters = read_counters(&path);
        counters[StatKind::FilesInCache] = num_files;
        counters[StatKind::CacheSizeKib] = total_size_kib;
        write_counters_atomic(&path, &counters)
    }
}
