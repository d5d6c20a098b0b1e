//! Optimistic timeline reconciliation properties

use chrono::Utc;
use proptest::prelude::*;
use serde_json::json;
use teamchat::client::{RoomTimeline, TimelineEntry};
use teamchat::shared::{ChatMessage, MessageType, ServerEvent};
use uuid::Uuid;

fn echo(room: Uuid, body: &str) -> ChatMessage {
    ChatMessage {
        id: Uuid::new_v4(),
        room,
        sender: "me".to_string(),
        kind: MessageType::Text,
        message: body.to_string(),
        meta: json!({}),
        created_at: Utc::now(),
        deleted_at: None,
    }
}

proptest! {
    /// Confirming staged sends in any order replaces each placeholder once
    #[test]
    fn test_every_echo_replaces_one_placeholder(
        count in 1usize..12,
        seed in any::<u64>(),
    ) {
        let room = Uuid::new_v4();
        let mut timeline = RoomTimeline::new(room);
        let mut requests: Vec<_> = (0..count)
            .map(|_| timeline.stage_send(MessageType::Text, "same text", None))
            .collect();

        // Deterministic shuffle driven by the generated seed
        let len = requests.len();
        for i in 0..len {
            let j = (seed as usize).wrapping_add(i * 7) % len;
            requests.swap(i, j);
        }

        for (confirmed, request) in requests.iter().enumerate() {
            let event = ServerEvent::message(echo(room, "same text"), request.correlation_token.clone());
            timeline.apply(&event);
            timeline.apply(&event);
            prop_assert_eq!(timeline.pending_count(), count - confirmed - 1);
            prop_assert_eq!(timeline.entries().len(), count);
        }

        prop_assert!(timeline
            .entries()
            .iter()
            .all(|entry| matches!(entry, TimelineEntry::Confirmed(_))));
    }
}
