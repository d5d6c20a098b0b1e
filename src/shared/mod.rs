//! Shared Module
//!
//! Types shared between the server and its clients. Everything here is
//! serializable and is what travels over the WebSocket channel and the
//! history API.
//!
//! # Overview
//!
//! - **`message`** - Stored message records, message types and typed bodies
//! - **`event`** - Client commands and server events on the socket channel
//! - **`room`** - Room records and slug parsing (team-scoped naming)
//! - **`error`** - Validation errors raised while parsing wire payloads

/// Message records and typed bodies
pub mod message;

/// Socket commands and events
pub mod event;

/// Room records and slugs
pub mod room;

/// Shared error types
pub mod error;

/// Re-export commonly used types for convenience
pub use message::{ChatMessage, HistoryPage, MessageBody, MessageType};
pub use event::{ClientCommand, ServerEvent};
pub use room::{Room, RoomSlug, TEAM_ROOM_PREFIX};
pub use error::SharedError;
