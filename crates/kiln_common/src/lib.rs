//! Shared foundational types used across the Kiln compiler cache.
//!
//! This crate provides the content hash type used for cache keys and shard
//! selection, and the size formatting/parsing helpers for the kibibyte
//! counters that appear throughout the statistics subsystem.

#![warn(missing_docs)]

pub mod hash;
pub mod size;

pub use hash::ContentHash;
pub use size::{format_size, parse_size, ParseSizeError};
