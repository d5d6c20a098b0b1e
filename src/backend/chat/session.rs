/**
 * Connection Session
 *
 * State owned by one socket connection: its identity (bound once at
 * handshake), the rooms it has joined, and the outbox drained by the
 * connection's writer task.
 *
 * Each joined room has a forwarding task relaying the room's broadcast
 * channel into the outbox. Dropping the session aborts those tasks, which
 * drops the receivers and with them every subscription.
 */
use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{broadcast, mpsc, Notify};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::backend::auth::Identity;
use crate::backend::error::ChatError;
use crate::backend::realtime::{ConnectionId, RoomBroadcast};
use crate::shared::ServerEvent;

/// Events a connection may have queued before it counts as too slow
pub const OUTBOX_CAPACITY: usize = 1024;

/// Sending half of a connection's bounded outbox
///
/// A full outbox drops the event and raises the overflow signal; the
/// connection loop closes the socket when it sees it.
#[derive(Debug, Clone)]
pub struct Outbox {
    sender: mpsc::Sender<ServerEvent>,
    overflow: Arc<Notify>,
}

impl Outbox {
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<ServerEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let outbox = Self {
            sender,
            overflow: Arc::new(Notify::new()),
        };
        (outbox, receiver)
    }

    /// Queue an event; `false` when the writer is gone or the outbox is full
    pub fn push(&self, event: ServerEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                self.overflow.notify_one();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Resolves once an event has been dropped on a full outbox
    pub async fn overflowed(&self) {
        self.overflow.notified().await;
    }
}

pub struct Session {
    id: ConnectionId,
    identity: Identity,
    outbox: Outbox,
    joined: HashMap<Uuid, JoinHandle<()>>,
}

impl Session {
    pub fn new(identity: Identity, outbox: Outbox) -> Self {
        Self {
            id: Uuid::new_v4(),
            identity,
            outbox,
            joined: HashMap::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user_id(&self) -> &str {
        &self.identity.id
    }

    pub fn has_joined(&self, room_id: Uuid) -> bool {
        self.joined.contains_key(&room_id)
    }

    pub fn joined_rooms(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.joined.keys().copied()
    }

    /// Fail with `NotJoined` unless `room_id` was joined on this connection
    pub fn ensure_joined(&self, room_id: Uuid) -> Result<(), ChatError> {
        if self.has_joined(room_id) {
            Ok(())
        } else {
            Err(ChatError::NotJoined { room_id })
        }
    }

    /// Start relaying a room's broadcasts into the outbox
    ///
    /// Returns `false` (and drops `receiver`) if the room is already
    /// attached, so a connection never holds two subscriptions to a room.
    pub fn attach(&mut self, room_id: Uuid, receiver: broadcast::Receiver<RoomBroadcast>) -> bool {
        if self.has_joined(room_id) {
            return false;
        }
        let task = tokio::spawn(forward(self.id, room_id, receiver, self.outbox.clone()));
        self.joined.insert(room_id, task);
        true
    }

    /// Send an event to this connection only
    pub fn reply(&self, event: ServerEvent) {
        if !self.outbox.push(event) {
            tracing::debug!("[Session] Reply to {} dropped", self.id);
        }
    }

    /// Drop every room subscription
    pub fn close(&mut self) {
        for (_, task) in self.joined.drain() {
            task.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

async fn forward(
    connection: ConnectionId,
    room_id: Uuid,
    receiver: broadcast::Receiver<RoomBroadcast>,
    outbox: Outbox,
) {
    let mut stream = BroadcastStream::new(receiver);
    while let Some(item) = stream.next().await {
        match item {
            Ok(message) if message.is_for(connection) => {
                if !outbox.push(message.event) {
                    tracing::warn!(
                        "[Session] Connection {} stopped receiving room {}",
                        connection,
                        room_id
                    );
                    break;
                }
            }
            Ok(_) => {}
            Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                tracing::warn!(
                    "[Session] Connection {} lagged {} events in room {}",
                    connection,
                    skipped,
                    room_id
                );
            }
        }
    }
}
