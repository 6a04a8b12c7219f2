//! Error types for the library.

use thiserror::Error;

/// Crate-level errors.
///
/// Telemetry requests never surface these to HTTP callers; they cover
/// startup concerns such as configuration and binding the listener.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
