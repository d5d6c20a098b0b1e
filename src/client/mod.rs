//! Client Module
//!
//! UI-agnostic client session state. A UI owns one `RoomTimeline` per open
//! room and one `TypingTracker`, feeds them every `ServerEvent` it
//! receives, and renders from them.
//!
//! # Optimistic Sends
//!
//! 1. `RoomTimeline::stage_send` adds a pending placeholder and returns the
//!    `send` request carrying a fresh correlation token
//! 2. the server broadcasts the stored record with the same token
//! 3. `RoomTimeline::apply` replaces exactly that placeholder
//!
//! An `error` reply carrying the token marks that placeholder failed.
//! Placeholders that are never answered are failed by `expire_pending`.
//! Failed sends can be retried or discarded.
//!
//! # Typing
//!
//! The server only relays typing signals. `TypingTracker` expires them
//! client-side after a TTL, so a client that disconnects mid-typing does
//! not leave a stale indicator.

/// Optimistic per-room message timeline
pub mod timeline;

/// Typing indicator expiry
pub mod typing;

pub use timeline::{PendingMessage, RoomTimeline, TimelineChange, TimelineEntry};
pub use typing::{TypingTracker, DEFAULT_TYPING_TTL};
