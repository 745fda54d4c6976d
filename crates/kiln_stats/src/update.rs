//! The lock-mediated update protocol and the cleanup trigger.
//!
//! This is the correctness-critical piece of the accounting engine. Updates
//! to one shard are serialized by that shard's lock file; the stats file is
//! replaced by atomic rename so a concurrent reader sees either the old or
//! the new counters, never a partial write. Lock acquisition failure
//! abandons the update silently — lost updates are an accepted tradeoff for
//! availability, since a competing process will update soon enough.

use std::path::Path;

use crate::codec::{read_counters, write_counters_atomic};
use crate::counter::{Counters, StatKind};
use crate::error::StatsError;
use crate::ledger::Ledger;
use crate::lock::LockFile;
use crate::shard::{Shard, StatsStore};

/// Environment variable that disables all stats flushing for the process.
///
/// Any value counts; checked once per flush.
pub const NOSTATS_ENV: &str = "KILN_NOSTATS";

/// Policy hook that evicts entries from a shard directory.
///
/// The accounting core decides *when* eviction is needed; which files to
/// delete, and in what order, lives behind this trait with its own locking.
/// A limit of 0 means "no limit" for that dimension and never triggers.
pub trait CleanupEngine {
    /// Bring `shard_dir` back under `max_files` files and `max_size_kib`
    /// kibibytes.
    fn cleanup(&self, shard_dir: &Path, max_files: u64, max_size_kib: u64);
}

/// A cleanup engine that does nothing.
///
/// For consumers that run eviction out-of-band (or not at all) but still
/// need to flush counters.
pub struct NoCleanup;

impl CleanupEngine for NoCleanup {
    fn cleanup(&self, _shard_dir: &Path, _max_files: u64, _max_size_kib: u64) {}
}

impl StatsStore {
    /// Merges `deltas` into one shard's persisted counters.
    ///
    /// Returns the merged vector, or `Ok(None)` when the shard lock could
    /// not be acquired — the update is abandoned and nothing changed on
    /// disk. A failed write is returned as an error: the invocation must
    /// not continue believing counters it failed to persist.
    pub fn update(&self, shard: Shard, deltas: &Counters) -> Result<Option<Counters>, StatsError> {
        let path = self.shard_stats_path(shard)?;
        let Some(_guard) = LockFile::acquire(&path, self.lock_staleness()) else {
            return Ok(None);
        };
        let mut counters = read_counters(&path);
        counters.merge(deltas);
        write_counters_atomic(&path, &counters)?;
        Ok(Some(counters))
    }

    /// Flushes a pending ledger into the cache, triggering cleanup if the
    /// merged counters exceed the shard's configured limits.
    ///
    /// The ledger is consumed; flushing happens at most once per invocation.
    /// `shard_hint` names the shard of the entry this invocation touched;
    /// without one (the invocation failed before computing a cache key) the
    /// update lands in a shard derived from the pid. Returns `Ok(None)` when
    /// nothing was flushed: stats disabled via [`NOSTATS_ENV`], an empty
    /// ledger, or a contended lock.
    pub fn flush(
        &self,
        ledger: Ledger,
        shard_hint: Option<Shard>,
        cleanup: &dyn CleanupEngine,
    ) -> Result<Option<Counters>, StatsError> {
        if std::env::var_os(NOSTATS_ENV).is_some() {
            return Ok(None);
        }
        if ledger.is_empty() {
            return Ok(None);
        }

        let shard = shard_hint.unwrap_or_else(|| Shard::from_pid(std::process::id()));
        let deltas = ledger.into_counters();
        let Some(merged) = self.update(shard, &deltas)? else {
            return Ok(None);
        };

        // The shard lock is released by now; cleanup takes its own.
        self.trigger_cleanup_if_over_limit(shard, &merged, cleanup);
        Ok(Some(merged))
    }

    /// Invokes `cleanup` if the merged counters exceed an enforced limit.
    fn trigger_cleanup_if_over_limit(
        &self,
        shard: Shard,
        merged: &Counters,
        cleanup: &dyn CleanupEngine,
    ) {
        let max_files = merged[StatKind::MaxFiles];
        let max_size = merged[StatKind::MaxSizeKib];
        let over_files = max_files != 0 && merged[StatKind::FilesInCache] > max_files;
        let over_size = max_size != 0 && merged[StatKind::CacheSizeKib] > max_size;
        if over_files || over_size {
            cleanup.cleanup(&self.shard_dir(shard), max_files, max_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::DEFAULT_SHARD_MAX_SIZE_KIB;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Serializes tests that read or mutate [`NOSTATS_ENV`].
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn env_guard() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn make_store() -> (tempfile::TempDir, StatsStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = StatsStore::new(dir.path(), Duration::from_secs(60));
        (dir, store)
    }

    #[derive(Default)]
    struct RecordingCleanup {
        calls: RefCell<Vec<(PathBuf, u64, u64)>>,
    }

    impl CleanupEngine for RecordingCleanup {
        fn cleanup(&self, shard_dir: &Path, max_files: u64, max_size_kib: u64) {
            self.calls
                .borrow_mut()
                .push((shard_dir.to_path_buf(), max_files, max_size_kib));
        }
    }

    fn deltas(pairs: &[(StatKind, u64)]) -> Counters {
        let mut c = Counters::zeroed();
        for &(kind, value) in pairs {
            c[kind] = value;
        }
        c
    }

    #[test]
    fn update_seeds_a_fresh_shard_with_defaults() {
        let (_dir, store) = make_store();
        let shard = Shard::new(4).unwrap();
        let merged = store
            .update(shard, &deltas(&[(StatKind::Miss, 1)]))
            .unwrap()
            .unwrap();
        assert_eq!(merged[StatKind::Miss], 1);
        assert_eq!(merged[StatKind::MaxSizeKib], DEFAULT_SHARD_MAX_SIZE_KIB);
    }

    #[test]
    fn update_merges_into_existing_counters() {
        let (_dir, store) = make_store();
        let shard = Shard::new(4).unwrap();
        store
            .update(shard, &deltas(&[(StatKind::Miss, 2)]))
            .unwrap();
        let merged = store
            .update(shard, &deltas(&[(StatKind::Miss, 3), (StatKind::HitDirect, 1)]))
            .unwrap()
            .unwrap();
        assert_eq!(merged[StatKind::Miss], 5);
        assert_eq!(merged[StatKind::HitDirect], 1);
    }

    #[test]
    fn update_order_does_not_matter() {
        let (_dir_a, store_a) = make_store();
        let (_dir_b, store_b) = make_store();
        let shard = Shard::new(7).unwrap();
        let d1 = deltas(&[(StatKind::HitDirect, 2), (StatKind::CacheSizeKib, 100)]);
        let d2 = deltas(&[(StatKind::Miss, 5), (StatKind::CacheSizeKib, 50)]);

        store_a.update(shard, &d1).unwrap();
        let a = store_a.update(shard, &d2).unwrap().unwrap();
        store_b.update(shard, &d2).unwrap();
        let b = store_b.update(shard, &d1).unwrap().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn update_abandoned_when_lock_is_held() {
        let (_dir, store) = make_store();
        let shard = Shard::new(9).unwrap();
        let path = store.shard_stats_path(shard).unwrap();
        let _held = LockFile::acquire(&path, Duration::from_secs(60)).unwrap();

        let result = store.update(shard, &deltas(&[(StatKind::Miss, 1)])).unwrap();
        assert!(result.is_none());
        assert!(!path.exists(), "abandoned update must not touch the file");
    }

    #[test]
    fn concurrent_updates_to_different_shards_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();

        let handles: Vec<_> = (0..4u8)
            .map(|nibble| {
                let root = root.clone();
                std::thread::spawn(move || {
                    let store = StatsStore::new(&root, Duration::from_secs(60));
                    let shard = Shard::new(nibble).unwrap();
                    for _ in 0..25 {
                        store
                            .update(shard, &deltas(&[(StatKind::Miss, 1)]))
                            .unwrap()
                            .expect("uncontended shard lock");
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let store = StatsStore::new(&root, Duration::from_secs(60));
        for nibble in 0..4u8 {
            let shard = Shard::new(nibble).unwrap();
            let counters = read_counters(&store.shard_stats_path(shard).unwrap());
            assert_eq!(counters[StatKind::Miss], 25, "shard {shard}");
        }
    }

    #[test]
    fn flush_writes_the_recorded_scenario() {
        let _env = env_guard();
        let (_dir, store) = make_store();
        let shard = Shard::new(0xc).unwrap();

        let mut ledger = Ledger::new();
        ledger.record(StatKind::HitDirect);
        ledger.record_with_size(Some(StatKind::Miss), 512, 1);

        let merged = store
            .flush(ledger, Some(shard), &NoCleanup)
            .unwrap()
            .expect("uncontended flush");

        let on_disk = read_counters(&store.shard_stats_path(shard).unwrap());
        assert_eq!(on_disk, merged);
        assert_eq!(on_disk[StatKind::HitDirect], 1);
        assert_eq!(on_disk[StatKind::Miss], 1);
        assert_eq!(on_disk[StatKind::FilesInCache], 1);
        assert_eq!(on_disk[StatKind::CacheSizeKib], 512);
        assert_eq!(on_disk[StatKind::MaxSizeKib], DEFAULT_SHARD_MAX_SIZE_KIB);
        for kind in StatKind::ALL {
            if !matches!(
                kind,
                StatKind::HitDirect
                    | StatKind::Miss
                    | StatKind::FilesInCache
                    | StatKind::CacheSizeKib
                    | StatKind::MaxSizeKib
            ) {
                assert_eq!(on_disk[kind], 0, "{kind:?} should be untouched");
            }
        }
    }

    #[test]
    fn flush_of_empty_ledger_is_a_no_op() {
        let _env = env_guard();
        let (dir, store) = make_store();
        let result = store.flush(Ledger::new(), None, &NoCleanup).unwrap();
        assert!(result.is_none());
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 0, "no shard directory should be created");
    }

    #[test]
    fn flush_without_hint_lands_in_the_pid_shard() {
        let _env = env_guard();
        let (_dir, store) = make_store();
        let mut ledger = Ledger::new();
        ledger.record(StatKind::PreprocessorError);
        store.flush(ledger, None, &NoCleanup).unwrap().unwrap();

        let shard = Shard::from_pid(std::process::id());
        let counters = read_counters(&store.shard_stats_path(shard).unwrap());
        assert_eq!(counters[StatKind::PreprocessorError], 1);
    }

    #[test]
    fn flush_respects_the_opt_out_env() {
        let _env = env_guard();
        std::env::set_var(NOSTATS_ENV, "1");
        let (dir, store) = make_store();
        let mut ledger = Ledger::new();
        ledger.record(StatKind::Miss);
        let result = store.flush(ledger, Some(Shard::new(1).unwrap()), &NoCleanup);
        std::env::remove_var(NOSTATS_ENV);

        assert!(result.unwrap().is_none());
        assert!(!dir.path().join("1").exists());
    }

    #[test]
    fn cleanup_triggers_once_when_file_limit_exceeded() {
        let _env = env_guard();
        let (_dir, store) = make_store();
        let shard = Shard::new(2).unwrap();
        store.set_limits(Some(160), Some(16 * DEFAULT_SHARD_MAX_SIZE_KIB)).unwrap();

        let mut ledger = Ledger::new();
        ledger.record_with_size(Some(StatKind::Miss), 1, 11);
        let cleanup = RecordingCleanup::default();
        store.flush(ledger, Some(shard), &cleanup).unwrap().unwrap();

        let calls = cleanup.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, store.shard_dir(shard));
        assert_eq!(calls[0].1, 10);
        assert_eq!(calls[0].2, DEFAULT_SHARD_MAX_SIZE_KIB);
    }

    #[test]
    fn cleanup_triggers_on_size_limit() {
        let _env = env_guard();
        let (_dir, store) = make_store();
        let shard = Shard::new(2).unwrap();

        let mut ledger = Ledger::new();
        // One file larger than the default shard quota.
        ledger.record_with_size(Some(StatKind::Miss), DEFAULT_SHARD_MAX_SIZE_KIB + 1, 1);
        let cleanup = RecordingCleanup::default();
        store.flush(ledger, Some(shard), &cleanup).unwrap().unwrap();
        assert_eq!(cleanup.calls.borrow().len(), 1);
    }

    #[test]
    fn zero_limit_never_triggers_cleanup() {
        let _env = env_guard();
        let (_dir, store) = make_store();
        let shard = Shard::new(5).unwrap();
        // 0 means "no limit" in both dimensions.
        store.set_limits(Some(0), Some(0)).unwrap();

        let mut ledger = Ledger::new();
        ledger.record_with_size(Some(StatKind::Miss), u64::MAX / 2, 1_000_000);
        let cleanup = RecordingCleanup::default();
        store.flush(ledger, Some(shard), &cleanup).unwrap().unwrap();
        assert!(cleanup.calls.borrow().is_empty());
    }

    #[test]
    fn under_limit_does_not_trigger_cleanup() {
        let _env = env_guard();
        let (_dir, store) = make_store();
        let shard = Shard::new(5).unwrap();
        store.set_limits(Some(160), None).unwrap();

        let mut ledger = Ledger::new();
        ledger.record_with_size(Some(StatKind::Miss), 1, 10);
        let cleanup = RecordingCleanup::default();
        store.flush(ledger, Some(shard), &cleanup).unwrap().unwrap();
        // Exactly at the limit of 10 is not over it.
        assert!(cleanup.calls.borrow().is_empty());
    }

    #[test]
    fn cleanup_runs_after_the_shard_lock_is_released() {
        let _env = env_guard();
        let (_dir, store) = make_store();
        let shard = Shard::new(8).unwrap();

        struct LockChecker {
            stats_path: PathBuf,
            saw_released: RefCell<bool>,
        }
        impl CleanupEngine for LockChecker {
            fn cleanup(&self, _shard_dir: &Path, _max_files: u64, _max_size_kib: u64) {
                let mut lock_name = self.stats_path.as_os_str().to_os_string();
                lock_name.push(".lock");
                *self.saw_released.borrow_mut() = !PathBuf::from(lock_name).exists();
            }
        }

        let checker = LockChecker {
            stats_path: store.shard_stats_path(shard).unwrap(),
            saw_released: RefCell::new(false),
        };
        let mut ledger = Ledger::new();
        ledger.record_with_size(Some(StatKind::Miss), DEFAULT_SHARD_MAX_SIZE_KIB + 1, 1);
        store.flush(ledger, Some(shard), &checker).unwrap().unwrap();
        assert!(*checker.saw_released.borrow());
    }
}
