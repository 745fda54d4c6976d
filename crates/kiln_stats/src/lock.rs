//! Advisory lock files guarding per-shard stats files.
//!
//! The lock for `<path>` is the file `<path>.lock`, created atomically with
//! `create_new` and holding the owner's pid. Cooperating processes on one
//! shared cache directory are the only parties; the lock is advisory and
//! means nothing to the rest of the system.
//!
//! A crashed holder must not wedge its shard forever, so staleness is an
//! explicit capability of the lock: a lock file older than the configured
//! staleness bound is considered abandoned and may be forcibly broken by the
//! next contender.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How many times acquisition retries before giving up.
const ACQUIRE_ATTEMPTS: u32 = 10;

/// Pause between contended acquisition attempts.
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// An advisory, staleness-bounded lock on a stats file path.
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Returns the lock that guards `target` (the file `<target>.lock`).
    pub fn for_target(target: &Path) -> Self {
        let mut name = target.as_os_str().to_os_string();
        name.push(".lock");
        Self {
            path: PathBuf::from(name),
        }
    }

    /// Attempts to acquire the lock guarding `target`.
    ///
    /// Contended attempts retry briefly, breaking the lock first if it has
    /// gone stale. Returns `None` when the lock stays held by a live process
    /// or cannot be created at all (for example, the shard directory does
    /// not exist); the caller abandons its operation rather than blocking.
    pub fn acquire(target: &Path, staleness_limit: Duration) -> Option<LockGuard> {
        let lock = Self::for_target(target);
        for _ in 0..ACQUIRE_ATTEMPTS {
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock.path)
            {
                Ok(mut file) => {
                    // Holder pid, for diagnosing who left a stale lock.
                    let _ = write!(file, "{}", std::process::id());
                    return Some(LockGuard {
                        path: lock.path.clone(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if lock.is_stale(staleness_limit) {
                        // Break and retry immediately; losing the race to
                        // another breaker just means the next create_new
                        // attempt is contended again.
                        let _ = lock.force_break();
                    } else {
                        std::thread::sleep(RETRY_DELAY);
                    }
                }
                Err(_) => return None,
            }
        }
        None
    }

    /// The path of the lock file itself.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the lock file is older than `staleness_limit`.
    ///
    /// Judged by the lock file's mtime, which survives a crashed holder and
    /// needs no coordination beyond the shared filesystem. A missing lock
    /// file (or one with an mtime in the future) is not stale.
    pub fn is_stale(&self, staleness_limit: Duration) -> bool {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|mtime| mtime.elapsed().ok())
            .is_some_and(|age| age > staleness_limit)
    }

    /// Removes the lock file regardless of holder.
    pub fn force_break(&self) -> std::io::Result<()> {
        std::fs::remove_file(&self.path)
    }
}

/// A held lock, released (the lock file removed) on drop.
pub struct LockGuard {
    path: PathBuf,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
