//! Error types for `notekeep` core library.

use thiserror::Error;

/// Result type alias using `notekeep` Error.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for `notekeep` operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
