//! Cache accounting and eviction engine for the Kiln compiler cache.
//!
//! The cache directory is split into 16 shard directories, each owning one
//! small text "stats" file of usage counters. Concurrent, uncoordinated
//! compiler invocations accumulate counter deltas in an in-process
//! [`Ledger`] and merge them into one shard's file at process exit through a
//! lock-mediated read-modify-atomic-write protocol. After each merge the
//! persisted counters are compared against the shard's configured limits and
//! an external cleanup engine is triggered when a limit is exceeded.
//!
//! There is no central coordinator and no database: lock files and atomic
//! renames are the only primitives, so a crashed process can never leave a
//! partially-written stats file visible to a reader.

#![warn(missing_docs)]

pub mod admin;
pub mod codec;
pub mod counter;
pub mod error;
pub mod ledger;
pub mod lock;
pub mod shard;
pub mod update;

pub use admin::Summary;
pub use codec::{decode, default_counters, encode, DEFAULT_SHARD_MAX_SIZE_KIB};
pub use counter::{Counters, DisplayAs, StatInfo, StatKind, STAT_INFO};
pub use error::StatsError;
pub use ledger::Ledger;
pub use lock::{LockFile, LockGuard};
pub use shard::{Shard, StatsStore, STATS_FILE_NAME};
pub use update::{CleanupEngine, NoCleanup, NOSTATS_ENV};
