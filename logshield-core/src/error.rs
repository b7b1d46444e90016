//! Error types for logshield-core

use thiserror::Error;

/// Main error type for the logshield-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Local storage error
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport error (resolve failure, socket error, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// Pipeline error (worker gone, inbox full)
    #[error("pipeline error: {0}")]
    Pipeline(String),
}

/// Result type alias for logshield-core
pub type Result<T> = std::result::Result<T, Error>;
