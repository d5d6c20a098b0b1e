//! Chat Handlers Module
//!
//! Axum handlers for the chat endpoints.
//!
//! - **`socket`** - WebSocket upgrade with handshake authentication (GET /ws)
//! - **`history`** - Room history and room lookup (GET /api/rooms/...)

/// WebSocket upgrade handler
pub mod socket;

/// History and room lookup handlers
pub mod history;

pub use history::{get_room, get_room_history};
pub use socket::handle_socket_upgrade;
