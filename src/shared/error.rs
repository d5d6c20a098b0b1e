//! Shared Error Types
//!
//! Errors raised while turning wire payloads into typed values. They are
//! used on both sides of the socket: the server rejects a command with
//! them, and clients can run the same checks before sending.
//!
//! # Error Categories
//!
//! - `SerializationError` - JSON serialization/deserialization failures
//! - `ValidationError` - A field is present but its value is unacceptable
//!
//! # Usage
//!
//! ```rust
//! use teamchat::shared::error::SharedError;
//!
//! let error = SharedError::validation("slug", "must not be empty");
//! assert!(error.to_string().contains("slug"));
//! ```
use thiserror::Error;

/// Shared error types that can occur in both server and client code
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SharedError {
    /// JSON serialization or deserialization error
    #[error("Serialization error: {message}")]
    SerializationError {
        /// Human-readable error message
        message: String,
    },

    /// Data validation error
    #[error("Validation error in field '{field}': {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// Human-readable error message
        message: String,
    },
}

impl SharedError {
    /// Create a new serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::SerializationError {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for SharedError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(format!("JSON error: {}", err))
    }
}
