//! Routes Module
//!
//! HTTP route configuration.
//!
//! # Module Structure
//!
//! ```text
//! routes/
//! ├── mod.rs         - Module exports and documentation
//! ├── router.rs      - Main router assembly, layers, fallback
//! ├── chat_routes.rs - Socket route
//! └── api_routes.rs  - Room API and health routes
//! ```

/// Main router creation
pub mod router;

/// Socket route configuration
pub mod chat_routes;

/// API route configuration
pub mod api_routes;

pub use router::create_router;
