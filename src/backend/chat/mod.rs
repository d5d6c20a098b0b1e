//! Chat Backend Module
//!
//! The chat session engine and its socket plumbing.
//!
//! # Module Structure
//!
//! ```text
//! chat/
//! ├── mod.rs        - Module exports and documentation
//! ├── engine.rs     - Command execution, history reads
//! ├── session.rs    - Per-connection state and room forwarding
//! ├── connection.rs - Socket read loop and writer task
//! └── handlers/     - Axum handlers (socket upgrade, history)
//! ```
//!
//! # Lifecycle of a Connection
//!
//! 1. `GET /ws` verifies the credential and upgrades
//! 2. `run_connection` creates a `Session` bound to the identity
//! 3. each text frame becomes a `ClientCommand` for `ChatEngine::handle`
//! 4. on close the session is dropped and its subscriptions with it

/// Command execution
pub mod engine;

/// Per-connection state
pub mod session;

/// Socket read loop and writer
pub mod connection;

/// Axum handlers
pub mod handlers;

pub use engine::{ChatEngine, ChatLimits, HistoryParams};
pub use session::Session;
