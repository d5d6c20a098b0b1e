/**
 * Socket Commands and Events
 *
 * Every frame on the chat socket is a JSON text frame of the form
 * `{"event": <name>, "data": <payload>}`.
 *
 * # Client → Server
 *
 * - `join` - `{slug, name?, description?}`
 * - `send` - `{roomId, type, message, meta?, correlationToken?}`
 * - `typing` - `{roomId, isTyping}`
 * - `delete` - `{messageId, roomId}`
 *
 * # Server → Client
 *
 * - `joined` - `{roomId, slug}` (requester only)
 * - `error` - `{message, correlationToken?}` (requester only)
 * - `message` - stored message plus `correlationToken?` (whole room)
 * - `typing` - `{roomId, userId, isTyping}` (room, minus the emitting connection)
 * - `deleted` - `{messageId, roomId}` (whole room)
 */
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::shared::message::{ChatMessage, MessageType};

/// Command sent by a client over the socket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientCommand {
    Join(JoinRequest),
    Send(SendRequest),
    Typing(TypingRequest),
    Delete(DeleteRequest),
}

impl ClientCommand {
    /// Wire name of the command, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::Join(_) => "join",
            ClientCommand::Send(_) => "send",
            ClientCommand::Typing(_) => "typing",
            ClientCommand::Delete(_) => "delete",
        }
    }
}

/// Join (and lazily create) a room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JoinRequest {
    pub slug: String,
    /// Display name, only used when the room is created by this join
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Description, only used when the room is created by this join
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Post a message to a joined room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub room_id: Uuid,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    /// Client-chosen token echoed back in the `message` broadcast
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TypingRequest {
    pub room_id: Uuid,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRequest {
    pub message_id: Uuid,
    pub room_id: Uuid,
}

/// Event sent by the server over the socket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    Joined(JoinedPayload),
    Error(ErrorPayload),
    Message(MessagePayload),
    Typing(TypingPayload),
    Deleted(DeletedPayload),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedPayload {
    pub room_id: Uuid,
    pub slug: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub message: String,
    /// Token of the rejected `send`, so the client can fail its placeholder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// Broadcast form of a stored message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(flatten)]
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    pub room_id: Uuid,
    pub user_id: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedPayload {
    pub message_id: Uuid,
    pub room_id: Uuid,
}

impl ServerEvent {
    pub fn joined(room_id: Uuid, slug: impl Into<String>) -> Self {
        Self::Joined(JoinedPayload {
            room_id,
            slug: slug.into(),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::error_for(message, None)
    }

    /// Error answering a command that carried a correlation token
    pub fn error_for(message: impl Into<String>, correlation_token: Option<String>) -> Self {
        Self::Error(ErrorPayload {
            message: message.into(),
            correlation_token,
        })
    }

    pub fn message(message: ChatMessage, correlation_token: Option<String>) -> Self {
        Self::Message(MessagePayload {
            message,
            correlation_token,
        })
    }

    pub fn typing(room_id: Uuid, user_id: impl Into<String>, is_typing: bool) -> Self {
        Self::Typing(TypingPayload {
            room_id,
            user_id: user_id.into(),
            is_typing,
        })
    }

    pub fn deleted(message_id: Uuid, room_id: Uuid) -> Self {
        Self::Deleted(DeletedPayload {
            message_id,
            room_id,
        })
    }

    /// Wire name of the event, for logging
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Joined(_) => "joined",
            ServerEvent::Error(_) => "error",
            ServerEvent::Message(_) => "message",
            ServerEvent::Typing(_) => "typing",
            ServerEvent::Deleted(_) => "deleted",
        }
    }
}
