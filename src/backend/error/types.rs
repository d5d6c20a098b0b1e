/**
 * Backend Error Types
 *
 * # Error Categories
 *
 * ## Chat Errors
 *
 * Raised while handling a socket command or an HTTP request. A chat error
 * never closes a connection; the engine turns it into an `error` event for
 * the requester.
 *
 * ## Store Errors
 *
 * Raised by the storage backends. They are logged in full and reported to
 * clients as a generic internal error.
 *
 * ## Auth Errors
 *
 * Raised while extracting or verifying a credential. Any of them refuses
 * the connection with 401.
 */
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::shared::SharedError;

/// Message shown to clients for storage and serialization faults
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Errors raised while handling a chat command or request
#[derive(Debug, Error)]
pub enum ChatError {
    /// The caller has no valid identity
    #[error("Unauthenticated: {message}")]
    Unauthenticated { message: String },

    /// The caller is authenticated but may not access the room
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// A room or record does not exist
    #[error("Not found: {message}")]
    NotFound { message: String },

    /// The command targets a room this connection has not joined
    #[error("Room {room_id} has not been joined on this connection")]
    NotJoined { room_id: Uuid },

    /// The payload is malformed or violates a field rule
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Storage fault
    #[error(transparent)]
    Storage(#[from] StoreError),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChatError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated {
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Get the HTTP status code for this error
    ///
    /// # Status Code Mapping
    ///
    /// - `Unauthenticated` - 401
    /// - `Forbidden`, `NotJoined` - 403
    /// - `NotFound` - 404
    /// - `Validation` - 400
    /// - `Storage`, `Serialization` - 500
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Self::Forbidden { .. } | Self::NotJoined { .. } => StatusCode::FORBIDDEN,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::Storage(_) | Self::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the client
    ///
    /// Internal faults are reported generically; their detail only goes
    /// to the log.
    pub fn message(&self) -> String {
        match self {
            Self::Unauthenticated { message }
            | Self::Forbidden { message }
            | Self::NotFound { message }
            | Self::Validation { message } => message.clone(),
            Self::NotJoined { .. } => "join the room before using it".to_string(),
            Self::Storage(_) | Self::Serialization(_) => INTERNAL_ERROR_MESSAGE.to_string(),
        }
    }

    /// Whether this error is a server-side fault rather than a client mistake
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Serialization(_))
    }
}

impl From<SharedError> for ChatError {
    fn from(err: SharedError) -> Self {
        match err {
            SharedError::ValidationError { field, message } => {
                Self::validation(format!("{field} {message}"))
            }
            SharedError::SerializationError { message } => Self::validation(message),
        }
    }
}

/// Errors raised by a storage backend
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The backend cannot serve requests right now
    #[error("Storage unavailable: {message}")]
    Unavailable { message: String },

    /// A stored row cannot be mapped back into a record
    #[error("Corrupt record: {message}")]
    Corrupt { message: String },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn corrupt(message: impl Into<String>) -> Self {
        Self::Corrupt {
            message: message.into(),
        }
    }
}

/// Credential and token failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No credential on the request, or a placeholder value
    #[error("Missing credential")]
    MissingCredential,

    /// Signature, expiry or format check failed
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    /// The token verified but names no user
    #[error("Token carries no user id claim")]
    MissingUserId,

    /// Signing a new token failed
    #[error("Failed to issue token: {0}")]
    Issue(String),
}

impl From<AuthError> for ChatError {
    fn from(err: AuthError) -> Self {
        Self::unauthenticated(err.to_string())
    }
}
