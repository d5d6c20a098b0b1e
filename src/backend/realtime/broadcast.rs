/**
 * Per-Room Broadcasting
 *
 * Every room that has at least one subscriber owns a
 * `tokio::sync::broadcast` channel. Each channel is paired with an async
 * send lock; holding it across persist-then-broadcast makes the broadcast
 * order of a room equal its persistence order.
 *
 * # Exclusion
 *
 * A broadcast can name one connection that must not receive it (typing
 * indicators are never echoed to their sender). Receivers filter on
 * `RoomBroadcast::is_for`.
 *
 * # Cleanup
 *
 * Channels are created on first subscribe and never removed while a
 * receiver or a send-lock holder exists. `cleanup_inactive_channels` drops
 * the rest; it runs periodically from the server janitor.
 */
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{broadcast, Mutex as AsyncMutex};
use uuid::Uuid;

use crate::shared::ServerEvent;

/// Identifies one socket connection
pub type ConnectionId = Uuid;

/// Events buffered per room before slow receivers start lagging
pub const DEFAULT_ROOM_CAPACITY: usize = 256;

/// An event published to a room
#[derive(Debug, Clone, PartialEq)]
pub struct RoomBroadcast {
    pub event: ServerEvent,
    /// Connection that must not receive this event
    pub exclude: Option<ConnectionId>,
}

impl RoomBroadcast {
    /// Delivered to every subscriber
    pub fn to_all(event: ServerEvent) -> Self {
        Self {
            event,
            exclude: None,
        }
    }

    /// Delivered to every subscriber except `connection`
    pub fn except(event: ServerEvent, connection: ConnectionId) -> Self {
        Self {
            event,
            exclude: Some(connection),
        }
    }

    pub fn is_for(&self, connection: ConnectionId) -> bool {
        self.exclude != Some(connection)
    }
}

struct RoomChannel {
    sender: broadcast::Sender<RoomBroadcast>,
    send_lock: Arc<AsyncMutex<()>>,
}

/// Registry of room broadcast channels
#[derive(Clone)]
pub struct RoomHub {
    channels: Arc<Mutex<HashMap<Uuid, RoomChannel>>>,
    capacity: usize,
}

impl Default for RoomHub {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomHub {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ROOM_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    fn channels(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, RoomChannel>> {
        self.channels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn channel_entry<'a>(
        channels: &'a mut HashMap<Uuid, RoomChannel>,
        room_id: Uuid,
        capacity: usize,
    ) -> &'a RoomChannel {
        channels.entry(room_id).or_insert_with(|| RoomChannel {
            sender: broadcast::channel(capacity).0,
            send_lock: Arc::new(AsyncMutex::new(())),
        })
    }

    /// Subscribe to a room, creating its channel if needed
    pub fn subscribe(&self, room_id: Uuid) -> broadcast::Receiver<RoomBroadcast> {
        let mut channels = self.channels();
        Self::channel_entry(&mut channels, room_id, self.capacity)
            .sender
            .subscribe()
    }

    /// Lock serializing persist-then-broadcast for a room
    pub fn send_lock(&self, room_id: Uuid) -> Arc<AsyncMutex<()>> {
        let mut channels = self.channels();
        Self::channel_entry(&mut channels, room_id, self.capacity)
            .send_lock
            .clone()
    }

    /// Publish to a room
    ///
    /// Returns the number of receivers the event was queued for. A room
    /// without subscribers is not an error.
    pub fn broadcast(&self, room_id: Uuid, message: RoomBroadcast) -> usize {
        let channels = self.channels();
        let Some(channel) = channels.get(&room_id) else {
            tracing::debug!("[Realtime] No channel for room {}", room_id);
            return 0;
        };

        let event = message.event.name();
        match channel.sender.send(message) {
            Ok(count) => {
                tracing::debug!(
                    "[Realtime] '{}' broadcast to {} subscribers of room {}",
                    event,
                    count,
                    room_id
                );
                count
            }
            Err(_) => {
                tracing::debug!("[Realtime] No subscribers in room {} for '{}'", room_id, event);
                0
            }
        }
    }

    pub fn subscriber_count(&self, room_id: Uuid) -> usize {
        self.channels()
            .get(&room_id)
            .map_or(0, |channel| channel.sender.receiver_count())
    }

    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }

    /// Drop channels with no receivers and no send in progress
    ///
    /// Returns how many channels were removed.
    pub fn cleanup_inactive_channels(&self) -> usize {
        let mut channels = self.channels();
        let before = channels.len();
        channels.retain(|_, channel| {
            channel.sender.receiver_count() > 0 || Arc::strong_count(&channel.send_lock) > 1
        });
        before - channels.len()
    }
}
