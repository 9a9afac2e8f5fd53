//! Error types for data parsing in ratwatch-types.

use thiserror::Error;

/// Errors that can occur when interpreting backend records.
///
/// This error type is platform-agnostic and does not include
/// transport errors (those belong in ratwatch-core).
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// A timestamp could not be interpreted.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A required field was absent from a record.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// A field held a value of the wrong shape.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue {
        /// The offending field name.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl ParseError {
    /// Create an invalid value error.
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Result type alias using ratwatch-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
