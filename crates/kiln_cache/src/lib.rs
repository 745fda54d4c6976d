//! Content-addressed object storage for the Kiln compiler cache.
//!
//! Compiled objects are stored under the same 16 shard directories that own
//! the statistics files, one object per content hash, each with a validated
//! binary header. Every store and every hit is reported into the invocation's
//! counter [`Ledger`](kiln_stats::Ledger) so the per-shard accounting tracks
//! real additions to the cache.

#![warn(missing_docs)]

pub mod artifact;
pub mod cache;
pub mod error;

pub use artifact::{ArtifactStore, StoredObject};
pub use cache::{Cache, HitKind};
pub use error::CacheError;
