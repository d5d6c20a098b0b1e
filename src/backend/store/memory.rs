/**
 * In-Memory Storage
 *
 * Used when no `DATABASE_URL` is configured and by the test suites. All
 * three storage traits share one lock, so slug creation and appends are
 * atomic with respect to each other.
 */
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::backend::error::StoreError;
use crate::backend::store::{
    HistoryQuery, MembershipOracle, MessageStore, NewMessage, RoomDirectory, Team,
};
use crate::shared::{ChatMessage, Room, RoomSlug};

#[derive(Default)]
struct Inner {
    rooms: HashMap<Uuid, Room>,
    slugs: HashMap<String, Uuid>,
    /// Append order
    messages: Vec<ChatMessage>,
    message_index: HashMap<Uuid, usize>,
    teams: HashMap<String, Team>,
    last_created: Option<DateTime<Utc>>,
}

impl Inner {
    /// Current time, bumped past the previous append when the clock has not moved
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let created_at = match self.last_created {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_created = Some(created_at);
        created_at
    }
}

/// Process-local store for rooms, messages and teams
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a team record
    pub async fn insert_team(&self, team: Team) {
        let mut inner = self.inner.write().await;
        inner.teams.insert(team.id.clone(), team);
    }

    pub async fn room_count(&self) -> usize {
        self.inner.read().await.rooms.len()
    }

    pub async fn message_count(&self) -> usize {
        self.inner.read().await.messages.len()
    }
}

#[async_trait]
impl RoomDirectory for MemoryStore {
    async fn resolve_or_create(
        &self,
        slug: &RoomSlug,
        name: &str,
        description: Option<&str>,
    ) -> Result<Room, StoreError> {
        let mut inner = self.inner.write().await;

        if let Some(room) = inner
            .slugs
            .get(slug.as_str())
            .and_then(|id| inner.rooms.get(id))
        {
            return Ok(room.clone());
        }

        let room = Room {
            id: Uuid::new_v4(),
            slug: slug.as_str().to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            members: Vec::new(),
            created_at: Utc::now(),
        };
        inner.slugs.insert(room.slug.clone(), room.id);
        inner.rooms.insert(room.id, room.clone());
        tracing::info!("[Store] Created room '{}' ({})", room.slug, room.id);

        Ok(room)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Room>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .slugs
            .get(slug)
            .and_then(|id| inner.rooms.get(id))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        Ok(self.inner.read().await.rooms.get(&id).cloned())
    }

    async fn add_member(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        let room = inner
            .rooms
            .get_mut(&room_id)
            .ok_or_else(|| StoreError::corrupt(format!("room {room_id} does not exist")))?;
        if !room.has_member(user_id) {
            room.members.push(user_id.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.rooms.contains_key(&message.room) {
            return Err(StoreError::corrupt(format!(
                "room {} does not exist",
                message.room
            )));
        }

        let stored = ChatMessage {
            id: Uuid::new_v4(),
            room: message.room,
            sender: message.sender,
            kind: message.kind,
            message: message.message,
            meta: message.meta,
            created_at: inner.next_timestamp(),
            deleted_at: None,
        };
        let index = inner.messages.len();
        inner.message_index.insert(stored.id, index);
        inner.messages.push(stored.clone());

        Ok(stored)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ChatMessage>, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .message_index
            .get(&id)
            .and_then(|index| inner.messages.get(*index))
            .cloned())
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut inner = self.inner.write().await;
        let Some(index) = inner.message_index.get(&id).copied() else {
            return Ok(false);
        };
        match inner.messages.get_mut(index) {
            Some(message) if message.deleted_at.is_none() => {
                message.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn history(&self, query: HistoryQuery) -> Result<Vec<ChatMessage>, StoreError> {
        let inner = self.inner.read().await;
        let mut page: Vec<ChatMessage> = inner
            .messages
            .iter()
            .rev()
            .filter(|m| m.room == query.room)
            .filter(|m| query.before.map_or(true, |before| m.created_at < before))
            .filter(|m| query.include_deleted || m.deleted_at.is_none())
            .take(query.limit)
            .cloned()
            .collect();
        page.reverse();
        Ok(page)
    }
}

#[async_trait]
impl MembershipOracle for MemoryStore {
    async fn is_authorized_for_team_room(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<bool, StoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .teams
            .get(team_id)
            .is_some_and(|team| team.authorizes(user_id)))
    }
}
