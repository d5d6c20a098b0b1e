//! Typing indicator expiry
//!
//! The server relays typing signals without storing them. An indicator
//! stays active until a `false` signal arrives or its TTL runs out.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::shared::event::TypingPayload;
use crate::shared::ServerEvent;

pub const DEFAULT_TYPING_TTL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct TypingTracker {
    self_id: String,
    ttl: Duration,
    last_seen: HashMap<(Uuid, String), Instant>,
}

impl TypingTracker {
    pub fn new(self_id: impl Into<String>) -> Self {
        Self::with_ttl(self_id, DEFAULT_TYPING_TTL)
    }

    pub fn with_ttl(self_id: impl Into<String>, ttl: Duration) -> Self {
        Self {
            self_id: self_id.into(),
            ttl,
            last_seen: HashMap::new(),
        }
    }

    /// Record a typing signal; signals about ourselves are ignored
    pub fn observe(&mut self, payload: &TypingPayload, now: Instant) {
        if payload.user_id == self.self_id {
            return;
        }
        let key = (payload.room_id, payload.user_id.clone());
        if payload.is_typing {
            self.last_seen.insert(key, now);
        } else {
            self.last_seen.remove(&key);
        }
    }

    /// Feed any server event; only `typing` events matter
    pub fn apply(&mut self, event: &ServerEvent, now: Instant) {
        if let ServerEvent::Typing(payload) = event {
            self.observe(payload, now);
        }
    }

    /// Users currently typing in `room_id`, sorted
    pub fn active(&self, room_id: Uuid, now: Instant) -> Vec<String> {
        let mut users: Vec<String> = self
            .last_seen
            .iter()
            .filter(|((room, _), seen)| *room == room_id && now.duration_since(**seen) < self.ttl)
            .map(|((_, user), _)| user.clone())
            .collect();
        users.sort();
        users
    }

    /// Forget expired indicators; returns how many were removed
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.last_seen.len();
        let ttl = self.ttl;
        self.last_seen
            .retain(|_, seen| now.duration_since(*seen) < ttl);
        before - self.last_seen.len()
    }
}
