//! Content-addressed binary object storage.
//!
//! Each compiled object lives at `cache_root/<shard>/<hash>.o`, where the
//! shard is the leading nibble of the content hash. Objects carry a header
//! with magic bytes, a format version, and a checksum; any validation
//! failure on read is a cache miss, never an error.

use std::path::{Path, PathBuf};

use kiln_common::ContentHash;
use kiln_stats::Shard;
use serde::{Deserialize, Serialize};

use crate::error::CacheError;

/// Magic bytes identifying a Kiln cache object.
const OBJECT_MAGIC: [u8; 4] = *b"KILN";

/// Current object format version. Increment on breaking changes to the
/// header or payload layout.
const OBJECT_FORMAT_VERSION: u32 = 1;

/// File extension for cached objects.
const OBJECT_EXT: &str = "o";

/// Header prepended to every cached object for validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectHeader {
    /// Magic bytes: must be `b"KILN"`.
    pub magic: [u8; 4],

    /// Object format version.
    pub format_version: u32,

    /// Kiln version that produced this object.
    pub kiln_version: String,

    /// Content hash of the payload (for integrity checks).
    pub checksum: ContentHash,
}

/// The outcome of storing one object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Where the object was written.
    pub path: PathBuf,

    /// The shard the object landed in.
    pub shard: Shard,

    /// On-disk size in kibibytes, rounded up. This is the figure the
    /// accounting counters carry.
    pub size_kib: u64,
}

/// Content-addressed store for compiled objects, sharded 16 ways.
pub struct ArtifactStore {
    cache_dir: PathBuf,
}

impl ArtifactStore {
    /// Creates a store rooted at the given cache directory.
    pub fn new(cache_dir: &Path) -> Self {
        Self {
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    /// The file path for the object with the given hash.
    pub fn object_path(&self, hash: &ContentHash) -> PathBuf {
        let shard = Shard::from_key(hash);
        self.cache_dir
            .join(shard.to_string())
            .join(format!("{hash}.{OBJECT_EXT}"))
    }

    /// Writes an object into its shard, creating the shard directory on
    /// demand.
    ///
    /// The payload is prefixed with a length-framed header: 4-byte header
    /// length (little-endian), the bincode-encoded [`ObjectHeader`], then
    /// the payload bytes.
    pub fn write_object(
        &self,
        hash: &ContentHash,
        data: &[u8],
        kiln_version: &str,
    ) -> Result<StoredObject, CacheError> {
        let shard = Shard::from_key(hash);
        let dir = self.cache_dir.join(shard.to_string());
        std::fs::create_dir_all(&dir).map_err(|e| CacheError::Io {
            path: dir.clone(),
            source: e,
        })?;

        let header = ObjectHeader {
            magic: OBJECT_MAGIC,
            format_version: OBJECT_FORMAT_VERSION,
            kiln_version: kiln_version.to_string(),
            checksum: ContentHash::from_bytes(data),
        };
        let header_bytes = bincode::serde::encode_to_vec(&header, bincode::config::standard())
            .map_err(|e| CacheError::Serialization {
                reason: e.to_string(),
            })?;

        let header_len = header_bytes.len() as u32;
        let mut output = Vec::with_capacity(4 + header_bytes.len() + data.len());
        output.extend_from_slice(&header_len.to_le_bytes());
        output.extend_from_slice(&header_bytes);
        output.extend_from_slice(data);

        let path = self.object_path(hash);
        std::fs::write(&path, &output).map_err(|e| CacheError::Io {
            path: path.clone(),
            source: e,
        })?;

        let size_kib = (output.len() as u64).div_ceil(1024);
        Ok(StoredObject {
            path,
            shard,
            size_kib,
        })
    }

    /// Reads an object, validating its header.
    ///
    /// Returns `None` if the file doesn't exist, the header is invalid, the
    /// format version doesn't match, or the checksum doesn't verify.
    pub fn read_object(&self, hash: &ContentHash) -> Option<Vec<u8>> {
        let path = self.object_path(hash);
        let raw = std::fs::read(&path).ok()?;

        if raw.len() < 4 {
            return None;
        }
        let header_len = u32::from_le_bytes(raw[..4].try_into().ok()?) as usize;
        if raw.len() < 4 + header_len {
            return None;
        }

        let header: ObjectHeader =
            bincode::serde::decode_from_slice(&raw[4..4 + header_len], bincode::config::standard())
                .ok()?
                .0;

        if header.magic != OBJECT_MAGIC {
            return None;
        }
        if header.format_version != OBJECT_FORMAT_VERSION {
            return None;
        }

        let payload = &raw[4 + header_len..];
        if ContentHash::from_bytes(payload) != header.checksum {
            return None;
        }

        Some(payload.to_vec())
    }
}
