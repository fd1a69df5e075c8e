//! Unified error system for Almanac
//!
//! Every layer (store, cache, coordinator, loader) reports failures through
//! [`AlmanacError`]. The variants map one-to-one onto the failure kinds the
//! rendering layer distinguishes: input that never reached the store,
//! references to missing activities, and failed reads or writes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// High-level error categories for frontend error handling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// User input validation errors (correctable by user)
    Input,
    /// Configuration errors (correctable by modifying settings)
    Config,
    /// Referenced activity does not exist
    NotFound,
    /// Failed read or write against the service boundary
    Operation,
    /// Invariant violation inside Almanac itself
    Internal,
}

impl ErrorCategory {
    /// Check if this error category is user-correctable.
    #[must_use]
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::Input | Self::Config)
    }

    /// Check if this error category is likely transient.
    ///
    /// Transient errors may resolve when the caller re-issues the operation.
    /// Almanac never retries on its own.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Operation)
    }

    /// Get a short label for this category.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Input => "Input",
            Self::Config => "Config",
            Self::NotFound => "Not Found",
            Self::Operation => "Operation",
            Self::Internal => "Internal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Unified error type for all Almanac operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum AlmanacError {
    /// Malformed or logically inconsistent input, rejected before any write
    #[error("{message}")]
    Validation {
        /// Message shown to the user as-is
        message: String,
    },

    /// An operation referenced an activity id that does not exist
    #[error("{message}")]
    NotFound {
        /// Error message describing what was not found
        message: String,
    },

    /// Generic failure of an underlying read or write
    #[error("Operation failed: {message}")]
    OperationFailed {
        /// Error message describing the failure
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration issue
        message: String,
    },

    /// Internal system error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message describing the internal error
        message: String,
    },
}

impl AlmanacError {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Create the not found error for a missing activity id
    pub fn activity_not_found(id: impl fmt::Display) -> Self {
        Self::not_found(format!("Activity not found: {id}"))
    }

    /// Create an operation failed error
    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::OperationFailed {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error for display and retry decisions.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Input,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::OperationFailed { .. } => ErrorCategory::Operation,
            Self::Config { .. } => ErrorCategory::Config,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Whether this is a `NotFound` error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Standard Result type for Almanac operations
pub type Result<T> = std::result::Result<T, AlmanacError>;

impl From<std::io::Error> for AlmanacError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::not_found(err.to_string()),
            _ => Self::operation_failed(err.to_string()),
        }
    }
}

impl From<toml::de::Error> for AlmanacError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<serde_json::Error> for AlmanacError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("Serialization error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = AlmanacError::validation("End time must be after start time");
        assert_eq!(err.to_string(), "End time must be after start time");
        assert_eq!(err.category(), ErrorCategory::Input);
        assert!(err.category().is_user_correctable());
    }

    #[test]
    fn test_activity_not_found() {
        let err = AlmanacError::activity_not_found(999);
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Activity not found: 999");
    }

    #[test]
    fn test_operation_failed_is_transient() {
        let err = AlmanacError::operation_failed("network down");
        assert!(err.category().is_transient());
        assert_eq!(err.to_string(), "Operation failed: network down");
    }

    #[test]
    fn test_io_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        assert!(AlmanacError::from(io_err).is_not_found());
    }
}
