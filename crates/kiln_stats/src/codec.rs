//! Reading and writing the on-disk stats file format.
//!
//! A stats file is plain text: one non-negative decimal integer per line,
//! one line per counter slot, in slot order. The decoder is deliberately
//! tolerant — truncation tolerance is load-bearing, because different kiln
//! versions (with different vector lengths) share one cache directory.
//! Writes go through a temp file and an atomic rename so no reader ever
//! observes a partially-written file.

use std::path::{Path, PathBuf};

use crate::counter::{Counters, StatKind};
use crate::error::StatsError;

/// Default per-shard size quota in kibibytes.
///
/// New shards are seeded with this cap rather than "unlimited": a 1 GiB
/// default for the whole cache, divided across the 16 shards.
pub const DEFAULT_SHARD_MAX_SIZE_KIB: u64 = (1024 * 1024) / 16;

/// Decodes stats file text into a counter vector (truncation-tolerant mode).
///
/// Whitespace/newline-delimited integers fill the vector positionally.
/// Parsing stops at the first unparsable token, leaving the remaining slots
/// at zero; tokens beyond the vector length are ignored. Short, corrupt, or
/// over-long input is therefore never an error.
pub fn decode(text: &str) -> Counters {
    let mut counters = Counters::zeroed();
    let slots = counters.as_mut_slice();
    for (i, token) in text.split_ascii_whitespace().enumerate() {
        if i >= StatKind::COUNT {
            break;
        }
        match token.parse::<u64>() {
            Ok(value) => slots[i] = value,
            Err(_) => break,
        }
    }
    counters
}

/// Encodes a counter vector as stats file text.
///
/// One decimal integer per line, in slot order.
pub fn encode(counters: &Counters) -> String {
    let mut out = String::with_capacity(StatKind::COUNT * 8);
    for value in counters.as_slice() {
        out.push_str(&value.to_string());
        out.push('\n');
    }
    out
}

/// Returns the vector a fresh shard starts from.
///
/// All slots zero except the size quota, which carries the built-in default.
pub fn default_counters() -> Counters {
    let mut counters = Counters::zeroed();
    counters[StatKind::MaxSizeKib] = DEFAULT_SHARD_MAX_SIZE_KIB;
    counters
}

/// Reads and decodes a shard's stats file.
///
/// An absent or unreadable file reads as the default vector; this is how a
/// shard comes into existence.
pub fn read_counters(path: &Path) -> Counters {
    match std::fs::read_to_string(path) {
        Ok(text) => decode(&text),
        Err(_) => default_counters(),
    }
}

/// Durably replaces a stats file with the given counters.
///
/// The encoded form is fully written to a uniquely-named temp file in the
/// same directory (suffixed with this process's pid) and renamed over the
/// target, so concurrent readers see either the old or the new contents and
/// never a prefix. Failure here is fatal to the invocation: it means disk
/// exhaustion or permission loss, not a recoverable race.
pub fn write_counters_atomic(path: &Path, counters: &Counters) -> Result<(), StatsError> {
    let mut tmp_name = path.as_os_str().to_os_string();
    tmp_name.push(format!(".tmp.{}", std::process::id()));
    let tmp = PathBuf::from(tmp_name);

    std::fs::write(&tmp, encode(counters)).map_err(|e| StatsError::Write {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        StatsError::Write {
            path: path.to_path_buf(),
            source: e,
        }
    })
}
