//! Error types for the Floodgate library.

use thiserror::Error;

/// Main error type for Floodgate operations.
#[derive(Error, Debug)]
pub enum FloodgateError {
    /// Configuration-related errors, raised at construction time
    #[error("Configuration error: {0}")]
    Config(String),

    /// Store transport or transaction errors
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// A window record contains data that cannot be interpreted
    #[error("Corrupt window state for key '{key}': {detail}")]
    CorruptState {
        /// The store key whose record is corrupt
        key: String,
        /// What could not be interpreted
        detail: String,
    },

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Floodgate operations.
pub type Result<T> = std::result::Result<T, FloodgateError>;
