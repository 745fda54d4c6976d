//! Configuration for the Kiln compiler cache.
//!
//! Configuration lives in `kiln.toml` inside the cache directory, with
//! environment variables taking precedence: `KILN_DIR` selects the cache
//! root, `KILN_NOSTATS` disables statistics flushing, and
//! `KILN_LOCK_STALENESS` overrides the lock staleness bound in seconds.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::CacheConfig;
