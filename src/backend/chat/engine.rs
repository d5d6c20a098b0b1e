/**
 * Chat Session Engine
 *
 * Executes socket commands for a session and serves history reads.
 *
 * # Commands
 *
 * - `join` - validate slug, check team membership for `team-*` slugs,
 *   resolve or create the room, record membership, subscribe, reply
 *   `joined`
 * - `send` - requires join; validate the typed body, persist, broadcast
 *   the stored record (with the correlation token) to the whole room
 * - `typing` - requires join; relay to every other subscriber
 * - `delete` - requires join; cross-check the message's room,
 *   soft-delete, broadcast `deleted` to the whole room
 *
 * A failing command is answered with an `error` event to the requester.
 * The connection stays open.
 *
 * # Ordering
 *
 * Persist-then-broadcast runs under the room's send lock, so every
 * subscriber sees a room's messages in persistence order.
 */
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::backend::chat::session::Session;
use crate::backend::error::ChatError;
use crate::backend::realtime::{RoomBroadcast, RoomHub};
use crate::backend::store::{HistoryQuery, NewMessage, Storage};
use crate::shared::event::{DeleteRequest, JoinRequest, SendRequest, TypingRequest};
use crate::shared::message::{meta_object, validate_content, MessageBody};
use crate::shared::{ChatMessage, ClientCommand, HistoryPage, Room, RoomSlug, ServerEvent};

/// Tunable limits of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChatLimits {
    /// Longest accepted message payload, in characters
    pub max_message_len: usize,
    /// History page size when the caller gives no limit
    pub history_page_size: usize,
    /// Upper bound on a history page
    pub history_max_page_size: usize,
}

impl Default for ChatLimits {
    fn default() -> Self {
        Self {
            max_message_len: 4000,
            history_page_size: 30,
            history_max_page_size: 100,
        }
    }
}

impl ChatLimits {
    /// Page size for a requested limit, clamped to `[1, history_max_page_size]`
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        requested
            .unwrap_or(self.history_page_size)
            .clamp(1, self.history_max_page_size.max(1))
    }
}

/// Parameters of a history request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryParams {
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub include_deleted: bool,
}

#[derive(Clone)]
pub struct ChatEngine {
    storage: Storage,
    hub: RoomHub,
    limits: ChatLimits,
}

impl ChatEngine {
    pub fn new(storage: Storage, hub: RoomHub, limits: ChatLimits) -> Self {
        Self {
            storage,
            hub,
            limits,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn hub(&self) -> &RoomHub {
        &self.hub
    }

    pub fn limits(&self) -> ChatLimits {
        self.limits
    }

    /// Run one command, answering failures with an `error` event
    pub async fn handle(&self, session: &mut Session, command: ClientCommand) {
        let name = command.name();
        tracing::debug!("[Engine] '{}' from user {}", name, session.user_id());

        let correlation_token = match &command {
            ClientCommand::Send(request) => request.correlation_token.clone(),
            _ => None,
        };

        let result = match command {
            ClientCommand::Join(request) => self.join(session, request).await.map(|_| ()),
            ClientCommand::Send(request) => self.send(session, request).await.map(|_| ()),
            ClientCommand::Typing(request) => self.typing(session, request),
            ClientCommand::Delete(request) => self.delete(session, request).await.map(|_| ()),
        };

        if let Err(err) = result {
            if err.is_internal() {
                tracing::error!(
                    "[Engine] '{}' from user {} failed: {}",
                    name,
                    session.user_id(),
                    err
                );
            } else {
                tracing::warn!(
                    "[Engine] '{}' from user {} rejected: {}",
                    name,
                    session.user_id(),
                    err
                );
            }
            session.reply(err.to_event(correlation_token));
        }
    }

    /// Check that `user_id` may enter the room addressed by `slug`
    ///
    /// Open rooms admit every authenticated user. Team rooms ask the
    /// membership oracle.
    pub async fn authorize_slug(&self, user_id: &str, slug: &RoomSlug) -> Result<(), ChatError> {
        let Some(team_id) = slug.team_id() else {
            return Ok(());
        };
        if self
            .storage
            .teams
            .is_authorized_for_team_room(user_id, team_id)
            .await?
        {
            Ok(())
        } else {
            Err(ChatError::forbidden("not a member of this team"))
        }
    }

    pub async fn join(&self, session: &mut Session, request: JoinRequest) -> Result<Room, ChatError> {
        let slug = RoomSlug::parse(request.slug.trim())?;
        self.authorize_slug(session.user_id(), &slug).await?;

        let name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(slug.as_str());
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|description| !description.is_empty());

        let room = self
            .storage
            .rooms
            .resolve_or_create(&slug, name, description)
            .await?;
        self.storage.rooms.add_member(room.id, session.user_id()).await?;

        // Subscribe before replying so nothing is missed, but only start
        // forwarding once `joined` is queued ahead of any room traffic.
        let receiver = self.hub.subscribe(room.id);
        session.reply(ServerEvent::joined(room.id, room.slug.clone()));
        if session.attach(room.id, receiver) {
            tracing::info!(
                "[Engine] User {} joined room '{}' ({})",
                session.user_id(),
                room.slug,
                room.id
            );
        }

        Ok(room)
    }

    pub async fn send(&self, session: &Session, request: SendRequest) -> Result<ChatMessage, ChatError> {
        session.ensure_joined(request.room_id)?;
        validate_content(&request.message, self.limits.max_message_len)?;

        let mut meta = meta_object(request.meta)?;
        MessageBody::from_meta(request.kind, &meta)?.write_meta(&mut meta);

        let lock = self.hub.send_lock(request.room_id);
        let _guard = lock.lock().await;

        let stored = self
            .storage
            .messages
            .append(NewMessage {
                room: request.room_id,
                sender: session.user_id().to_string(),
                kind: request.kind,
                message: request.message,
                meta: Value::Object(meta),
            })
            .await?;

        self.hub.broadcast(
            stored.room,
            RoomBroadcast::to_all(ServerEvent::message(stored.clone(), request.correlation_token)),
        );

        Ok(stored)
    }

    pub fn typing(&self, session: &Session, request: TypingRequest) -> Result<(), ChatError> {
        session.ensure_joined(request.room_id)?;
        self.hub.broadcast(
            request.room_id,
            RoomBroadcast::except(
                ServerEvent::typing(request.room_id, session.user_id(), request.is_typing),
                session.id(),
            ),
        );
        Ok(())
    }

    /// Soft-delete a message and tell the room
    ///
    /// Returns `false` when the message does not exist; that case is not
    /// reported to the client.
    pub async fn delete(&self, session: &Session, request: DeleteRequest) -> Result<bool, ChatError> {
        session.ensure_joined(request.room_id)?;

        let lock = self.hub.send_lock(request.room_id);
        let _guard = lock.lock().await;

        let Some(message) = self.storage.messages.find(request.message_id).await? else {
            tracing::debug!("[Engine] Delete of unknown message {}", request.message_id);
            return Ok(false);
        };
        if message.room != request.room_id {
            return Err(ChatError::validation("message does not belong to this room"));
        }

        if self.storage.messages.soft_delete(message.id).await? {
            tracing::info!(
                "[Engine] User {} deleted message {} in room {}",
                session.user_id(),
                message.id,
                message.room
            );
        }

        self.hub.broadcast(
            message.room,
            RoomBroadcast::to_all(ServerEvent::deleted(message.id, message.room)),
        );

        Ok(true)
    }

    /// Room addressed by `slug`, if `user_id` may read it
    ///
    /// Team rooms are checked against the membership oracle, any other
    /// room against its member set. Unknown slugs are `NotFound`.
    pub async fn room_for_member(&self, user_id: &str, slug: &str) -> Result<Room, ChatError> {
        let slug = RoomSlug::parse(slug)?;
        let room = self
            .storage
            .rooms
            .find_by_slug(slug.as_str())
            .await?
            .ok_or_else(|| ChatError::not_found(format!("room '{slug}' does not exist")))?;

        if slug.is_team_scoped() {
            self.authorize_slug(user_id, &slug).await?;
        } else if !room.has_member(user_id) {
            return Err(ChatError::forbidden("not a member of this room"));
        }

        Ok(room)
    }

    /// One page of a room's history, oldest first
    pub async fn history(
        &self,
        user_id: &str,
        slug: &str,
        params: HistoryParams,
    ) -> Result<HistoryPage, ChatError> {
        let room = self.room_for_member(user_id, slug).await?;
        let limit = self.limits.page_size(params.limit);

        let messages = self
            .storage
            .messages
            .history(HistoryQuery {
                room: room.id,
                before: params.before,
                limit,
                include_deleted: params.include_deleted,
            })
            .await?;

        let next_cursor = if messages.len() == limit {
            messages.first().map(|m| m.created_at)
        } else {
            None
        };

        Ok(HistoryPage {
            messages,
            next_cursor,
        })
    }

    /// Live subscribers of a room
    pub fn subscriber_count(&self, room_id: Uuid) -> usize {
        self.hub.subscriber_count(room_id)
    }
}
