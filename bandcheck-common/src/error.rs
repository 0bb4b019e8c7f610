//! Common error types for bandcheck

use thiserror::Error;

/// Common result type for bandcheck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the bandcheck crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML configuration file could not be parsed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON input or knowledge-base document could not be parsed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
