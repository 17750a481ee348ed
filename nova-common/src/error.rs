//! Common error types for NOVA

use thiserror::Error;

/// Common result type for NOVA operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the NOVA crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Profile name does not match any known execution profile
    #[error("Unknown execution profile: {0}")]
    UnknownProfile(String),
}
