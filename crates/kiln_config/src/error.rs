//! Error types for configuration loading.

/// Errors that can occur while loading `kiln.toml`.
///
/// A missing configuration file is not an error (the defaults apply); a
/// file that exists but cannot be parsed is, since silently ignoring it
/// would mask a typo in a deliberately-written setting.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file exists but is not valid TOML for the
    /// expected schema.
    #[error("failed to parse kiln.toml: {reason}")]
    Parse {
        /// Description of the parse failure.
        reason: String,
    },

    /// An environment override carries a value of the wrong shape.
    #[error("invalid value for {variable}: '{value}'")]
    InvalidEnv {
        /// The environment variable name.
        variable: &'static str,
        /// The offending value.
        value: String,
    },
}
