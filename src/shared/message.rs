/**
 * Message Data Structures
 *
 * This module defines the stored chat message record, the closed set of
 * message types, and the typed body each type carries in its metadata.
 *
 * On the wire a message is `{_id, room, sender, type, message, meta,
 * createdAt, deletedAt?}`. The `meta` object is free-form, but the fields
 * a type depends on (`language` for code, `fileName`/`fileSize`/`fileType`
 * for files) are checked through `MessageBody` before anything is stored.
 */
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Language tag used when a code message does not name one
pub const DEFAULT_CODE_LANGUAGE: &str = "plaintext";

/// MIME type used when a file message does not name one
pub const DEFAULT_FILE_TYPE: &str = "application/octet-stream";

/// Content type of a message
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    /// Plain text
    Text,
    /// Code snippet, tagged with a language
    Code,
    /// Reference to an uploaded file
    File,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Code => "code",
            MessageType::File => "file",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageType {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageType::Text),
            "code" => Ok(MessageType::Code),
            "file" => Ok(MessageType::File),
            other => Err(SharedError::validation(
                "type",
                format!("unknown message type '{other}'"),
            )),
        }
    }
}

/// Typed view of a message's type-dependent metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    Text,
    Code {
        language: String,
    },
    File {
        file_name: String,
        file_size: u64,
        file_type: String,
    },
}

impl MessageBody {
    /// Validate `meta` against the requirements of `kind`
    ///
    /// # Rules
    ///
    /// - `text` - no requirements
    /// - `code` - `language` must be a string when present; defaults to `plaintext`
    /// - `file` - `fileName` (non-empty string) and `fileSize` (non-negative
    ///   integer) are required; `fileType` must be a string when present
    pub fn from_meta(kind: MessageType, meta: &Map<String, Value>) -> Result<Self, SharedError> {
        match kind {
            MessageType::Text => Ok(MessageBody::Text),
            MessageType::Code => {
                let language = optional_str(meta, "language")?
                    .filter(|language| !language.trim().is_empty())
                    .unwrap_or(DEFAULT_CODE_LANGUAGE);
                Ok(MessageBody::Code {
                    language: language.to_string(),
                })
            }
            MessageType::File => {
                let file_name = optional_str(meta, "fileName")?
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| {
                        SharedError::validation("meta.fileName", "is required for file messages")
                    })?;
                let file_size = match meta.get("fileSize") {
                    Some(value) => value.as_u64().ok_or_else(|| {
                        SharedError::validation("meta.fileSize", "must be a non-negative integer")
                    })?,
                    None => {
                        return Err(SharedError::validation(
                            "meta.fileSize",
                            "is required for file messages",
                        ))
                    }
                };
                let file_type = optional_str(meta, "fileType")?.unwrap_or(DEFAULT_FILE_TYPE);
                Ok(MessageBody::File {
                    file_name: file_name.to_string(),
                    file_size,
                    file_type: file_type.to_string(),
                })
            }
        }
    }

    pub fn kind(&self) -> MessageType {
        match self {
            MessageBody::Text => MessageType::Text,
            MessageBody::Code { .. } => MessageType::Code,
            MessageBody::File { .. } => MessageType::File,
        }
    }

    /// Write the normalized typed fields back into `meta`
    ///
    /// Any other keys (tags, client annotations) are left untouched.
    pub fn write_meta(&self, meta: &mut Map<String, Value>) {
        match self {
            MessageBody::Text => {}
            MessageBody::Code { language } => {
                meta.insert("language".into(), Value::String(language.clone()));
            }
            MessageBody::File {
                file_name,
                file_size,
                file_type,
            } => {
                meta.insert("fileName".into(), Value::String(file_name.clone()));
                meta.insert("fileSize".into(), Value::from(*file_size));
                meta.insert("fileType".into(), Value::String(file_type.clone()));
            }
        }
    }
}

fn optional_str<'a>(meta: &'a Map<String, Value>, key: &str) -> Result<Option<&'a str>, SharedError> {
    match meta.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(SharedError::validation(
            format!("meta.{key}"),
            "must be a string",
        )),
    }
}

/// Turn an optional wire `meta` value into an object
///
/// Absent and `null` become an empty object; anything that is not an
/// object is rejected.
pub fn meta_object(meta: Option<Value>) -> Result<Map<String, Value>, SharedError> {
    match meta {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(SharedError::validation("meta", "must be an object")),
    }
}

/// Check a message payload: not blank and at most `max_chars` characters
pub fn validate_content(content: &str, max_chars: usize) -> Result<(), SharedError> {
    if content.trim().is_empty() {
        return Err(SharedError::validation("message", "must not be empty"));
    }
    if content.chars().count() > max_chars {
        return Err(SharedError::validation(
            "message",
            format!("must be at most {max_chars} characters"),
        ));
    }
    Ok(())
}

/// A persisted chat message
///
/// Core fields never change after the record is created. The only
/// transition is `deleted_at` going from `None` to `Some` (soft delete).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Server-generated message ID
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Owning room ID
    pub room: Uuid,
    /// Sender's user ID
    pub sender: String,
    /// Content type
    #[serde(rename = "type")]
    pub kind: MessageType,
    /// Textual payload (text, code, or a file reference)
    pub message: String,
    /// Free-form metadata, normalized for the message type
    pub meta: Value,
    /// Server-assigned creation time
    pub created_at: DateTime<Utc>,
    /// Soft-delete marker
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ChatMessage {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Typed view of this message's metadata
    pub fn body(&self) -> Result<MessageBody, SharedError> {
        let empty = Map::new();
        let meta = self.meta.as_object().unwrap_or(&empty);
        MessageBody::from_meta(self.kind, meta)
    }
}

/// One page of room history
///
/// Messages are oldest-first. `next_cursor` is the `createdAt` of the
/// oldest message when the page was full, to be passed back as `before`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HistoryPage {
    pub messages: Vec<ChatMessage>,
    pub next_cursor: Option<DateTime<Utc>>,
}
