//! Storage Module
//!
//! Persistence for rooms, messages and (read-only) team membership. Each
//! concern sits behind an `async_trait` so the engine can run against
//! Postgres or the in-memory backend without knowing which.
//!
//! # Module Structure
//!
//! ```text
//! store/
//! ├── mod.rs      - Traits, team records, the `Storage` bundle
//! ├── memory.rs   - In-memory backend (no DATABASE_URL, tests)
//! └── postgres.rs - sqlx Postgres backend
//! ```
//!
//! # Contracts
//!
//! - `RoomDirectory::resolve_or_create` yields exactly one room per slug,
//!   even under concurrent creation
//! - `MessageStore::append` assigns the id and `created_at`; `created_at`
//!   strictly increases in append order within a room
//! - `MessageStore::soft_delete` is the only mutation of a stored message
//! - storage faults are returned as `StoreError`, never as empty results

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::backend::error::StoreError;
use crate::shared::{ChatMessage, MessageType, Room, RoomSlug};

/// In-memory backend
pub mod memory;

/// Postgres backend
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Slug → room lookup with lazy creation
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    /// Return the room for `slug`, creating it if it does not exist
    ///
    /// `name` and `description` are only used when the room is created.
    async fn resolve_or_create(
        &self,
        slug: &RoomSlug,
        name: &str,
        description: Option<&str>,
    ) -> Result<Room, StoreError>;

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Room>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError>;

    /// Add `user_id` to the room's member set (no-op when already present)
    async fn add_member(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError>;
}

/// Fields of a message before the store assigns its id and timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub room: Uuid,
    pub sender: String,
    pub kind: MessageType,
    pub message: String,
    pub meta: Value,
}

/// Parameters of a history read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryQuery {
    pub room: Uuid,
    /// Only messages strictly older than this
    pub before: Option<DateTime<Utc>>,
    pub limit: usize,
    pub include_deleted: bool,
}

/// Append-only per-room message log
#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(&self, message: NewMessage) -> Result<ChatMessage, StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<ChatMessage>, StoreError>;

    /// Set `deleted_at` if it is not set yet
    ///
    /// Returns `true` when this call tombstoned the message. Unknown ids and
    /// already-deleted messages return `false`.
    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// The newest `limit` matching messages, oldest first
    async fn history(&self, query: HistoryQuery) -> Result<Vec<ChatMessage>, StoreError>;
}

/// Team membership lookups
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    /// Owner or accepted member of `team_id`; unknown teams are never authorized
    async fn is_authorized_for_team_room(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<bool, StoreError>;
}

/// Status of a filled team slot
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SlotStatus {
    Pending,
    Accepted,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Pending => "pending",
            SlotStatus::Accepted => "accepted",
        }
    }
}

/// A seat in a team, possibly not yet bound to a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberSlot {
    pub user: Option<String>,
    pub status: SlotStatus,
}

impl MemberSlot {
    pub fn unfilled() -> Self {
        Self {
            user: None,
            status: SlotStatus::Pending,
        }
    }

    pub fn pending(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            status: SlotStatus::Pending,
        }
    }

    pub fn accepted(user: impl Into<String>) -> Self {
        Self {
            user: Some(user.into()),
            status: SlotStatus::Accepted,
        }
    }
}

/// Team record as owned by the wider application
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub owner: String,
    #[serde(default)]
    pub members: Vec<MemberSlot>,
}

impl Team {
    /// Whether `user_id` may use this team's room
    pub fn authorizes(&self, user_id: &str) -> bool {
        self.owner == user_id
            || self.members.iter().any(|slot| {
                slot.status == SlotStatus::Accepted && slot.user.as_deref() == Some(user_id)
            })
    }
}

/// Which backend a `Storage` bundle runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    Memory,
    Postgres,
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageKind::Memory => f.write_str("memory"),
            StorageKind::Postgres => f.write_str("postgres"),
        }
    }
}

/// The storage services the engine depends on
#[derive(Clone)]
pub struct Storage {
    pub rooms: Arc<dyn RoomDirectory>,
    pub messages: Arc<dyn MessageStore>,
    pub teams: Arc<dyn MembershipOracle>,
    pub kind: StorageKind,
}

impl Storage {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            rooms: store.clone(),
            messages: store.clone(),
            teams: store,
            kind: StorageKind::Memory,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        let store = Arc::new(PgStore::new(pool));
        Self {
            rooms: store.clone(),
            messages: store.clone(),
            teams: store,
            kind: StorageKind::Postgres,
        }
    }
}

impl fmt::Debug for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Storage").field("kind", &self.kind).finish()
    }
}
