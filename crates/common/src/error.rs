//! Common error types

use thiserror::Error;

/// Configuration and startup error shared by the gateway crates.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Config or token file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The gateway config file failed to parse.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result alias using common Error
pub type Result<T> = std::result::Result<T, Error>;
