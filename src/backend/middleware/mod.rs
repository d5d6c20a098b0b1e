//! Middleware Module
//!
//! HTTP middleware for the backend server.
//!
//! - **`auth`** - Bearer-token authentication for the HTTP API
//!
//! The socket endpoint does not use this middleware: it authenticates
//! during the upgrade so that the `?token=` query parameter is also
//! accepted.

pub mod auth;

pub use auth::{auth_middleware, AuthUser};
