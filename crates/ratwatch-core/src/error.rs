//! Error types for ratwatch-core.
//!
//! This module defines the errors that can surface from the backend
//! collaborators (push channel, document store, notification scheduler) and
//! from configuration.
//!
//! # Error Recovery Strategies
//!
//! | Error Type | Strategy | Rationale |
//! |------------|----------|-----------|
//! | [`Error::Channel`] | Resubscribe with backoff | Stream dropped or proxy reset |
//! | [`Error::Query`] | Retry on next refresh tick | Transient backend failure |
//! | [`Error::Timeout`] | Retry (2-3 times) | Slow network |
//! | [`Error::Notification`] | Drop | Notifications are best effort |
//! | [`Error::PermissionDenied`] | Drop silently | User choice |
//! | [`Error::InvalidData`] | Do not retry | Malformed record, report |
//! | [`Error::InvalidConfig`] | Do not retry | Fix configuration and restart |
//!
//! The dashboard controller never lets these errors escape: they are logged
//! and recorded in the status note of [`crate::DashboardState`].

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while talking to the dashboard backends.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The push channel failed to subscribe, stream or write.
    #[error("Push channel error on '{path}': {reason}")]
    Channel {
        /// Path being subscribed to or written.
        path: String,
        /// What went wrong.
        reason: String,
    },

    /// The document store query failed.
    #[error("Query failed for collection '{collection}': {reason}")]
    Query {
        /// Collection being queried.
        collection: String,
        /// What went wrong.
        reason: String,
    },

    /// The notification scheduler rejected a notification.
    #[error("Notification failed: {0}")]
    Notification(String),

    /// Notification permission was not granted.
    #[error("Notification permission denied")]
    PermissionDenied,

    /// A backend record could not be interpreted.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Operation timed out.
    #[error("Operation '{operation}' timed out after {duration:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// The timeout duration.
        duration: Duration,
    },

    /// Operation was cancelled.
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a push channel error.
    pub fn channel(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Channel {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a document store query error.
    pub fn query(collection: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Query {
            collection: collection.into(),
            reason: reason.into(),
        }
    }

    /// Create a timeout error with operation context.
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Channel { .. } | Error::Query { .. } | Error::Timeout { .. } | Error::Io(_)
        )
    }
}

impl From<ratwatch_types::ParseError> for Error {
    fn from(err: ratwatch_types::ParseError) -> Self {
        Error::InvalidData(err.to_string())
    }
}

/// Result type alias using ratwatch-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::channel("SensorStatus/message", "stream closed");
        assert!(err.to_string().contains("SensorStatus/message"));
        assert!(err.to_string().contains("stream closed"));

        let err = Error::query("SensorLogs", "HTTP 503");
        assert!(err.to_string().contains("SensorLogs"));

        let err = Error::PermissionDenied;
        assert_eq!(err.to_string(), "Notification permission denied");

        let err = Error::timeout("log_fetch", Duration::from_secs(10));
        assert!(err.to_string().contains("log_fetch"));
        assert!(err.to_string().contains("10s"));
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::channel("a", "b").is_transient());
        assert!(Error::query("a", "b").is_transient());
        assert!(Error::timeout("a", Duration::from_secs(1)).is_transient());
        assert!(!Error::PermissionDenied.is_transient());
        assert!(!Error::invalid_config("bad").is_transient());
        assert!(!Error::Cancelled.is_transient());
    }

    #[test]
    fn test_parse_error_conversion() {
        let err: Error = ratwatch_types::ParseError::MissingField("id").into();
        assert!(matches!(err, Error::InvalidData(_)));
        assert!(err.to_string().contains("id"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }
}
