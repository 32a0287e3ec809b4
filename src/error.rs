//! Error types for the ratelog crate.

use thiserror::Error;

/// Main error type for ratelog operations.
#[derive(Error, Debug)]
pub enum RatelogError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ratelog operations.
pub type Result<T> = std::result::Result<T, RatelogError>;
