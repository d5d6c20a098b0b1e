//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - An in-process server over the in-memory store
//! - A WebSocket client speaking the chat protocol
//! - Token helpers
//! - Custom assertion macros

#[macro_use]
pub mod assertions;
pub mod test_server;

// Re-export commonly used utilities
pub use auth_helpers::*;
pub use test_server::*;
