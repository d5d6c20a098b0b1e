//! Teamchat - Main Library
//!
//! Teamchat is the real-time chat service behind the team workspace: rooms
//! are joined over a WebSocket, messages are persisted and fanned out to
//! every subscriber of a room, and clients reconcile their optimistic
//! sends against the server's authoritative records.
//!
//! # Module Structure
//!
//! - **`shared`** - Types shared between server and clients
//!   - Wire commands and events, message records, room slugs
//!   - Validation errors
//!
//! - **`backend`** - The server
//!   - Axum HTTP/WebSocket server
//!   - JWT handshake authentication
//!   - Chat session engine and per-room broadcast groups
//!   - Room, message and team-membership storage (Postgres or in-memory)
//!
//! - **`client`** - UI-agnostic client session state
//!   - Optimistic timeline keyed by correlation tokens
//!   - Typing indicator expiry
//!
//! # Usage
//!
//! ```rust,no_run
//! use teamchat::backend::server::{config::ServerConfig, init::create_app};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ServerConfig::load()?;
//! let app = create_app(&config).await;
//! let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Thread Safety
//!
//! Server state is shared through `Arc`, storage backends are `Send + Sync`
//! trait objects, and room fan-out uses `tokio::sync::broadcast`.

/// Shared types and data structures
pub mod shared;

/// Backend server-side code
pub mod backend;

/// Client-side session state
pub mod client;
