//! Content hashing for cache keys and shard selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 128-bit content hash computed using XXH3.
///
/// Kiln derives a `ContentHash` from everything that determines a compile's
/// output: the preprocessed source, the compiler version, and the relevant
/// command-line flags. Two invocations with the same `ContentHash` are assumed
/// to produce identical object files.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        let hash = xxhash_rust::xxh3::xxh3_128(data);
        Self(hash.to_le_bytes())
    }

    /// Returns the leading hex nibble of the hash (0–15).
    ///
    /// This is the cache shard an entry with this hash belongs to: the first
    /// character of the hash's hex form names the shard directory.
    pub fn first_nibble(&self) -> u8 {
        self.0[0] >> 4
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}
