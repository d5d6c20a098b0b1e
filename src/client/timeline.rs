/**
 * Room Timeline
 *
 * Local view of one room: confirmed messages from the server interleaved
 * with the user's own unconfirmed sends.
 *
 * # Reconciliation
 *
 * A pending entry is keyed by its correlation token. When a `message`
 * event echoes that token, the pending entry is replaced in place by the
 * stored record. A token matches at most one pending entry, and a record
 * already in the timeline is never added twice.
 */
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::shared::event::SendRequest;
use crate::shared::{ChatMessage, HistoryPage, MessageType, ServerEvent};

/// Time after which an unconfirmed send is considered failed
pub const DEFAULT_PENDING_TIMEOUT: Duration = Duration::from_secs(15);

/// A send waiting for server confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    pub request: SendRequest,
    pub staged_at: DateTime<Utc>,
    pub failed: bool,
}

impl PendingMessage {
    pub fn correlation_token(&self) -> &str {
        self.request.correlation_token.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimelineEntry {
    Pending(PendingMessage),
    Confirmed(ChatMessage),
}

impl TimelineEntry {
    fn message_id(&self) -> Option<Uuid> {
        match self {
            TimelineEntry::Confirmed(message) => Some(message.id),
            TimelineEntry::Pending(_) => None,
        }
    }

    fn is_pending_for(&self, token: &str) -> bool {
        matches!(self, TimelineEntry::Pending(p) if p.correlation_token() == token)
    }
}

/// What `RoomTimeline::apply` did with an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineChange {
    /// A pending placeholder was replaced by its stored record
    Confirmed,
    /// A message from someone else (or another tab) was appended
    Appended,
    /// A message was flagged deleted
    Deleted,
    /// The server rejected a pending send
    Failed,
    /// The event did not concern this timeline, or was already applied
    Ignored,
}

#[derive(Debug, Clone)]
pub struct RoomTimeline {
    room_id: Uuid,
    entries: Vec<TimelineEntry>,
    pending_timeout: Duration,
}

impl RoomTimeline {
    pub fn new(room_id: Uuid) -> Self {
        Self::with_pending_timeout(room_id, DEFAULT_PENDING_TIMEOUT)
    }

    pub fn with_pending_timeout(room_id: Uuid, pending_timeout: Duration) -> Self {
        Self {
            room_id,
            entries: Vec::new(),
            pending_timeout,
        }
    }

    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn pending_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, TimelineEntry::Pending(_)))
            .count()
    }

    /// Confirmed, not deleted messages in display order
    pub fn visible_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.entries.iter().filter_map(|entry| match entry {
            TimelineEntry::Confirmed(message) if !message.is_deleted() => Some(message),
            _ => None,
        })
    }

    /// Add a placeholder and return the request to send
    pub fn stage_send(
        &mut self,
        kind: MessageType,
        message: impl Into<String>,
        meta: Option<Value>,
    ) -> SendRequest {
        let request = SendRequest {
            room_id: self.room_id,
            kind,
            message: message.into(),
            meta,
            correlation_token: Some(format!("tmp-{}", Uuid::new_v4())),
        };
        self.entries.push(TimelineEntry::Pending(PendingMessage {
            request: request.clone(),
            staged_at: Utc::now(),
            failed: false,
        }));
        request
    }

    /// Apply a server event to this timeline
    pub fn apply(&mut self, event: &ServerEvent) -> TimelineChange {
        match event {
            ServerEvent::Message(payload) if payload.message.room == self.room_id => {
                let message = &payload.message;
                if self.position_of(message.id).is_some() {
                    return TimelineChange::Ignored;
                }

                let pending = payload.correlation_token.as_deref().and_then(|token| {
                    self.entries.iter().position(|entry| entry.is_pending_for(token))
                });
                match pending {
                    Some(index) => {
                        self.entries[index] = TimelineEntry::Confirmed(message.clone());
                        TimelineChange::Confirmed
                    }
                    None => {
                        self.entries.push(TimelineEntry::Confirmed(message.clone()));
                        TimelineChange::Appended
                    }
                }
            }
            ServerEvent::Deleted(payload) if payload.room_id == self.room_id => {
                match self.position_of(payload.message_id) {
                    Some(index) => match &mut self.entries[index] {
                        TimelineEntry::Confirmed(message) if message.deleted_at.is_none() => {
                            message.deleted_at = Some(Utc::now());
                            TimelineChange::Deleted
                        }
                        _ => TimelineChange::Ignored,
                    },
                    None => TimelineChange::Ignored,
                }
            }
            ServerEvent::Error(payload) => match payload.correlation_token.as_deref() {
                Some(token) if self.mark_failed(token) => TimelineChange::Failed,
                _ => TimelineChange::Ignored,
            },
            _ => TimelineChange::Ignored,
        }
    }

    /// Mark a pending send as failed
    pub fn mark_failed(&mut self, token: &str) -> bool {
        match self.pending_mut(token) {
            Some(pending) => {
                pending.failed = true;
                true
            }
            None => false,
        }
    }

    /// Fail every pending send older than the timeout
    ///
    /// Returns the correlation tokens that were newly marked failed.
    pub fn expire_pending(&mut self, now: DateTime<Utc>) -> Vec<String> {
        let timeout = chrono::Duration::from_std(self.pending_timeout)
            .unwrap_or_else(|_| chrono::Duration::seconds(i64::from(u32::MAX)));
        let mut expired = Vec::new();
        for entry in &mut self.entries {
            if let TimelineEntry::Pending(pending) = entry {
                if !pending.failed && now - pending.staged_at >= timeout {
                    pending.failed = true;
                    expired.push(pending.correlation_token().to_string());
                }
            }
        }
        expired
    }

    /// Put a failed send back in flight, keeping its token
    pub fn retry(&mut self, token: &str) -> Option<SendRequest> {
        let pending = self.pending_mut(token).filter(|pending| pending.failed)?;
        pending.failed = false;
        pending.staged_at = Utc::now();
        Some(pending.request.clone())
    }

    /// Drop a pending send
    pub fn discard(&mut self, token: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| !entry.is_pending_for(token));
        self.entries.len() != before
    }

    /// Insert an older history page in front of the timeline
    ///
    /// Messages already present are skipped.
    pub fn prepend_history(&mut self, page: &HistoryPage) -> usize {
        let older: Vec<TimelineEntry> = page
            .messages
            .iter()
            .filter(|message| message.room == self.room_id)
            .filter(|message| self.position_of(message.id).is_none())
            .cloned()
            .map(TimelineEntry::Confirmed)
            .collect();
        let added = older.len();
        self.entries.splice(0..0, older);
        added
    }

    fn position_of(&self, message_id: Uuid) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.message_id() == Some(message_id))
    }

    fn pending_mut(&mut self, token: &str) -> Option<&mut PendingMessage> {
        self.entries.iter_mut().find_map(|entry| match entry {
            TimelineEntry::Pending(pending) if pending.correlation_token() == token => Some(pending),
            _ => None,
        })
    }
}
