//! Real-time Module
//!
//! Room-scoped fan-out for the chat socket.
//!
//! # Module Structure
//!
//! ```text
//! realtime/
//! ├── mod.rs       - Module exports and documentation
//! └── broadcast.rs - RoomHub: per-room broadcast channels and send locks
//! ```
//!
//! Sessions subscribe to a room's channel when they join it and drop the
//! receiver when the connection closes. The hub is the only shared mutable
//! state the chat engine owns.

/// Per-room broadcast channels
pub mod broadcast;

pub use broadcast::{ConnectionId, RoomBroadcast, RoomHub, DEFAULT_ROOM_CAPACITY};
