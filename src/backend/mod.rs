//! Backend Module
//!
//! The chat server: an Axum HTTP/WebSocket service with JWT handshake
//! authentication, room-based fan-out, and Postgres or in-memory storage.
//!
//! # Architecture
//!
//! - **`server`** - Configuration, application state, initialization
//! - **`routes`** - Router assembly and middleware layers
//! - **`chat`** - Session engine, socket connection loop, handlers
//! - **`realtime`** - Per-room broadcast channels
//! - **`store`** - Room directory, message store, membership oracle
//! - **`auth`** - JWT verification and identity normalization
//! - **`middleware`** - Bearer authentication for the HTTP API
//! - **`error`** - Backend error types and HTTP conversion
//!
//! # Module Structure
//!
//! ```text
//! backend/
//! ├── mod.rs       - Module exports and documentation
//! ├── main.rs      - Binary entry point
//! ├── server/      - Server initialization and state
//! ├── routes/      - Route configuration
//! ├── chat/        - Chat engine and handlers
//! ├── realtime/    - Room broadcasting
//! ├── store/       - Persistence
//! ├── auth/        - Authentication
//! ├── middleware/  - Request middleware
//! └── error/       - Error types
//! ```
//!
//! # Request Flow
//!
//! ## Socket
//!
//! 1. `GET /ws` with a token in the `Authorization` header or `?token=`
//! 2. The token is verified before the upgrade (401 on failure)
//! 3. Frames are `{"event", "data"}` JSON, handled by `ChatEngine`
//!
//! ## History
//!
//! 1. `GET /api/rooms/{slug}/messages` with a Bearer token
//! 2. `auth_middleware` verifies the token and stores the `Identity`
//! 3. The engine checks room membership and reads a page from the store

/// Server initialization and configuration
pub mod server;

/// Route configuration
pub mod routes;

/// Chat session engine and handlers
pub mod chat;

/// Per-room broadcasting
pub mod realtime;

/// Persistence
pub mod store;

/// Authentication
pub mod auth;

/// HTTP middleware
pub mod middleware;

/// Backend error types
pub mod error;

pub use error::{AuthError, ChatError, StoreError};
