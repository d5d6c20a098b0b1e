//! Server Module
//!
//! Server configuration, shared state and startup.
//!
//! # Module Structure
//!
//! ```text
//! server/
//! ├── mod.rs   - Module exports and documentation
//! ├── state.rs - AppState and FromRef implementations
//! ├── config.rs - ServerConfig loading, validation, database setup
//! └── init.rs  - App creation and background tasks
//! ```
//!
//! # Initialization Flow
//!
//! 1. **Configuration**: `ServerConfig::load()` reads `CHAT_CONFIG` and the environment
//! 2. **Storage**: Postgres when `DATABASE_URL` connects, in-memory otherwise
//! 3. **State**: chat engine, room hub and JWT keys in `AppState`
//! 4. **Background Tasks**: idle room channel cleanup
//! 5. **Router**: routes and middleware

/// Application state management
pub mod state;

/// Server configuration loading
pub mod config;

/// Server initialization
pub mod init;

pub use config::{ConfigError, ServerConfig};
pub use init::{build_app, create_app};
pub use state::AppState;
