//! The process-local ledger of pending counter updates.

use crate::counter::{Counters, StatKind};

/// Pending counter deltas for the current invocation.
///
/// A `Ledger` is created at process start, owned by the invocation's
/// top-level context, and threaded by reference into everything that reports
/// a statistic. Nothing here touches the filesystem: recording is pure
/// in-memory accumulation, and the whole ledger is consumed by value exactly
/// once at flush time ([`crate::StatsStore::flush`]).
///
/// Counters are unsigned and saturate instead of wrapping. A wrapped counter
/// could read back as a small value and silently under-trigger cleanup, so
/// pinning at `u64::MAX` is the safer degradation.
#[derive(Clone, Debug, Default)]
pub struct Ledger {
    pending: Counters,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments one pending counter by one.
    pub fn record(&mut self, kind: StatKind) {
        self.record_with_size(Some(kind), 0, 0);
    }

    /// Records an addition to the cache.
    ///
    /// Optionally increments a statistic counter, and always increments the
    /// file-count and total-size counters together so they stay consistent
    /// with real additions to the cache. `size_kib` is in kibibytes.
    pub fn record_with_size(&mut self, kind: Option<StatKind>, size_kib: u64, files: u64) {
        if let Some(kind) = kind {
            self.pending[kind] = self.pending[kind].saturating_add(1);
        }
        self.pending[StatKind::FilesInCache] =
            self.pending[StatKind::FilesInCache].saturating_add(files);
        self.pending[StatKind::CacheSizeKib] =
            self.pending[StatKind::CacheSizeKib].saturating_add(size_kib);
    }

    /// Returns the pending value of one counter, for diagnostic use.
    pub fn peek(&self, kind: StatKind) -> u64 {
        self.pending[kind]
    }

    /// `true` if nothing has been recorded; flushing an empty ledger is a
    /// no-op.
    pub fn is_empty(&self) -> bool {
        self.pending.is_zero()
    }

    /// Consumes the ledger, yielding the accumulated deltas.
    pub fn into_counters(self) -> Counters {
        self.pending
    }
}
