//! Error types for the query engine

use crate::query::error::QueryError;
use thiserror::Error;

/// Main error type for the engine
#[derive(Error, Debug)]
pub enum Error {
    /// Storage or registry collaborator failed
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Query could not be executed
    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the reading store and sensor registry
///
/// These are never retried inside the engine; a failed read fails the request.
#[derive(Error, Debug)]
pub enum StorageError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend could not be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Stored data could not be decoded
    #[error("Corrupted data: {0}")]
    CorruptedData(String),
}

/// Validation errors
///
/// Raised while checking configuration values.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Value is out of allowed range
    #[error("{field} value {value} is out of range [{min}, {max}]")]
    OutOfRange {
        /// Field name being validated
        field: String,
        /// The invalid value
        value: String,
        /// Minimum allowed value
        min: String,
        /// Maximum allowed value
        max: String,
    },

    /// Invalid format
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat {
        /// Field name being validated
        field: String,
        /// Description of the format error
        message: String,
    },
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Error::Configuration(e.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
