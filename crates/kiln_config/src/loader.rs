//! Configuration resolution: `kiln.toml`, environment, defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;
use crate::types::{CacheConfig, FileConfig};

/// Name of the configuration file inside the cache directory.
pub const CONFIG_FILE: &str = "kiln.toml";

/// Environment variable selecting the cache root directory.
pub const CACHE_DIR_ENV: &str = "KILN_DIR";

/// Environment variable disabling statistics flushing (any value).
pub const NOSTATS_ENV: &str = "KILN_NOSTATS";

/// Environment variable overriding the lock staleness bound, in seconds.
pub const LOCK_STALENESS_ENV: &str = "KILN_LOCK_STALENESS";

/// Resolves the full configuration for one invocation.
///
/// The cache directory is `cache_dir_override` if given (a CLI flag),
/// otherwise `$KILN_DIR`, otherwise `~/.kiln`. `kiln.toml` inside that
/// directory supplies the file settings — a missing file means defaults, a
/// malformed one is an error. `KILN_NOSTATS` and `KILN_LOCK_STALENESS`
/// override the corresponding file settings.
pub fn load_config(cache_dir_override: Option<&Path>) -> Result<CacheConfig, ConfigError> {
    let cache_dir = resolve_cache_dir(cache_dir_override);

    let file = match std::fs::read_to_string(cache_dir.join(CONFIG_FILE)) {
        Ok(text) => parse_file_config(&text)?,
        Err(_) => FileConfig::default(),
    };

    let lock_staleness_secs = match std::env::var(LOCK_STALENESS_ENV) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map_err(|_| ConfigError::InvalidEnv {
                variable: LOCK_STALENESS_ENV,
                value,
            })?,
        Err(_) => file.lock_staleness_secs,
    };

    let disable_stats = file.disable_stats || std::env::var_os(NOSTATS_ENV).is_some();

    Ok(CacheConfig {
        cache_dir,
        lock_staleness: Duration::from_secs(lock_staleness_secs),
        disable_stats,
    })
}

/// Parses `kiln.toml` text into file settings.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<FileConfig, ConfigError> {
    parse_file_config(content)
}

fn parse_file_config(content: &str) -> Result<FileConfig, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::Parse {
        reason: e.to_string(),
    })
}

fn resolve_cache_dir(cache_dir_override: Option<&Path>) -> PathBuf {
    if let Some(dir) = cache_dir_override {
        return dir.to_path_buf();
    }
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV) {
        return PathBuf::from(dir);
    }
    match std::env::var_os("HOME") {
        Some(home) => Path::new(&home).join(".kiln"),
        None => PathBuf::from(".kiln"),
    }
}
