//! Socket frame shape properties

use proptest::prelude::*;
use serde_json::json;
use teamchat::shared::event::{ClientCommand, SendRequest};
use teamchat::shared::{MessageType, ServerEvent};
use uuid::Uuid;

fn message_type() -> impl Strategy<Value = MessageType> {
    prop_oneof![
        Just(MessageType::Text),
        Just(MessageType::Code),
        Just(MessageType::File),
    ]
}

proptest! {
    #[test]
    fn test_send_command_parses_from_wire(
        kind in message_type(),
        message in ".{1,200}",
        token in proptest::option::of("tmp-[a-z0-9]{1,16}"),
    ) {
        let room_id = Uuid::new_v4();
        let mut data = json!({"roomId": room_id, "type": kind.as_str(), "message": message});
        if let Some(token) = &token {
            data["correlationToken"] = json!(token);
        }

        let command: ClientCommand = serde_json::from_value(json!({"event": "send", "data": data})).unwrap();
        prop_assert_eq!(
            command,
            ClientCommand::Send(SendRequest {
                room_id,
                kind,
                message,
                meta: None,
                correlation_token: token,
            })
        );
    }

    #[test]
    fn test_typing_event_is_tagged(user in "[a-z0-9]{1,24}", is_typing in any::<bool>()) {
        let room_id = Uuid::new_v4();
        let value = serde_json::to_value(ServerEvent::typing(room_id, user.clone(), is_typing)).unwrap();
        prop_assert_eq!(value["event"].as_str(), Some("typing"));
        prop_assert_eq!(value["data"]["userId"].as_str(), Some(user.as_str()));
        prop_assert_eq!(value["data"]["isTyping"].as_bool(), Some(is_typing));
    }

    #[test]
    fn test_unknown_events_are_rejected(event in "[a-z]{1,12}") {
        prop_assume!(!["join", "send", "typing", "delete"].contains(&event.as_str()));
        let frame = json!({"event": event, "data": {}});
        prop_assert!(serde_json::from_value::<ClientCommand>(frame).is_err());
    }
}
