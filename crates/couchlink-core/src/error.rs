//! Error types for couchlink core.

use thiserror::Error;

/// Errors raised while encoding or decoding documents.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed JSON or a value that does not fit the target type.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A `$type` tag names a type that was never registered.
    #[error("unknown document type: {0}")]
    UnknownType(String),

    /// A registry decode needed a `$type` tag and found none.
    #[error("document carries no type tag")]
    MissingTypeTag,
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

/// Argument validation failures, raised before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} must be at least {min}, got {got}")]
    OutOfRange {
        field: &'static str,
        min: usize,
        got: usize,
    },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
