//! Backend Error Module
//!
//! Error types raised by the chat engine, the storage layer and the
//! authenticator. They can be converted into HTTP responses and into
//! socket `error` events.
//!
//! # Module Structure
//!
//! ```text
//! error/
//! ├── mod.rs        - Module exports and documentation
//! ├── types.rs      - Error type definitions
//! └── conversion.rs - Error conversion implementations
//! ```
//!
//! # Error Types
//!
//! - `ChatError` - Per-command and per-request failures (engine and HTTP)
//! - `StoreError` - Storage faults (database, corrupt rows)
//! - `AuthError` - Credential extraction and token verification failures
//!
//! # HTTP Response Conversion
//!
//! `ChatError` implements `IntoResponse`, so handlers can return it
//! directly. The body is `{"error": <message>, "status": <code>}`.

/// Error type definitions
pub mod types;

/// Error conversion implementations
pub mod conversion;

pub use types::{AuthError, ChatError, StoreError};
