//! Error types for the statistics subsystem.

use std::path::PathBuf;

/// Errors that can escape a statistics operation.
///
/// The taxonomy is deliberately small. Lock contention is not an error (the
/// operation is silently abandoned), and a corrupt or missing stats file is
/// not an error (it reads as a fresh default vector). What remains is the
/// durable-failure class: a stats file that cannot be written means the
/// cache would believe a different size/file state than reality, so it is
/// surfaced to the caller instead of swallowed.
#[derive(Debug, thiserror::Error)]
pub enum StatsError {
    /// Writing or renaming a stats file failed (disk full, permission loss).
    #[error("failed to write stats file {path}: {source}")]
    Write {
        /// The stats file (or its temp sibling) that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A shard or cache-root directory could not be created.
    #[error("failed to create cache directory {path}: {source}")]
    CreateDir {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A file could not be removed (a missing file is not reported).
    #[error("failed to remove {path}: {source}")]
    RemoveFile {
        /// The file that could not be removed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_error_display() {
        let err = StatsError::Write {
            path: PathBuf::from("/cache/3/stats"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to write stats file"));
        assert!(msg.contains("/cache/3/stats"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn create_dir_error_display() {
        let err = StatsError::CreateDir {
            path: PathBuf::from("/cache/f"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("failed to create cache directory"));
        assert!(msg.contains("/cache/f"));
    }

    #[test]
    fn remove_file_error_display() {
        let err = StatsError::RemoveFile {
            path: PathBuf::from("/cache/stats"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("failed to remove"));
    }
}
