//! Chat socket behaviour end to end

use std::time::Duration;

use futures_util::future::join_all;
use serde_json::json;
use teamchat::backend::store::{MemberSlot, Team};
use uuid::Uuid;

use crate::common::*;

const SILENCE: Duration = Duration::from_millis(200);

async fn server_with_team() -> TestServer {
    let server = TestServer::start().await;
    server
        .store
        .insert_team(Team {
            id: "T1".to_string(),
            owner: "owner".to_string(),
            members: vec![
                MemberSlot::accepted("member"),
                MemberSlot::pending("invitee"),
                MemberSlot::unfilled(),
            ],
        })
        .await;
    server
}

#[tokio::test]
async fn test_owner_joins_team_room() {
    let server = server_with_team().await;
    let mut owner = server.connect("owner").await;
    owner.join("team-T1").await;

    let mut member = server.connect("member").await;
    member.join("team-T1").await;
}

#[tokio::test]
async fn test_outsider_cannot_use_team_room() {
    let server = server_with_team().await;
    let mut owner = server.connect("owner").await;
    let room_id = owner.join("team-T1").await;

    for user in ["outsider", "invitee"] {
        let mut client = server.connect(user).await;
        client
            .send_json(json!({"event": "join", "data": {"slug": "team-T1"}}))
            .await;
        let data = assert_event!(client.recv().await, "error");
        assert_contains!(data["message"].as_str().unwrap(), "not a member");

        // Never joined, so sending is refused and nothing reaches the room
        client.send_text(room_id, "let me in", None).await;
        let data = assert_event!(client.recv().await, "error");
        assert_contains!(data["message"].as_str().unwrap(), "join the room");

        owner.expect_silence(SILENCE).await;
    }

    owner.send_text(room_id, "members only", None).await;
    assert_event!(owner.recv().await, "message");
    assert_eq!(server.store.message_count().await, 1);
}

#[tokio::test]
async fn test_message_reaches_other_subscribers() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    let room_id = alice.join("general").await;
    assert_eq!(bob.join("general").await, room_id);

    alice.send_text(room_id, "hi", None).await;

    let to_bob = assert_event!(bob.recv().await, "message");
    assert_eq!(to_bob["message"], "hi");
    assert_eq!(to_bob["type"], "text");
    assert_eq!(to_bob["sender"], "alice");
    assert_eq!(to_bob["room"], json!(room_id));

    let to_alice = assert_event!(alice.recv().await, "message");
    assert_eq!(to_alice["_id"], to_bob["_id"]);
}

#[tokio::test]
async fn test_concurrent_joins_resolve_one_room() {
    let server = TestServer::start().await;
    let mut clients = Vec::new();
    for n in 0..8 {
        clients.push(server.connect(&format!("user-{n}")).await);
    }

    let room_ids: Vec<Uuid> = join_all(clients.iter_mut().map(|client| client.join("launch"))).await;

    assert!(room_ids.iter().all(|id| *id == room_ids[0]));
    assert_eq!(server.store.room_count().await, 1);
}

#[tokio::test]
async fn test_sequential_sends_arrive_in_order() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    let room_id = alice.join("general").await;
    bob.join("general").await;

    for n in 0..20 {
        alice.send_text(room_id, &format!("msg-{n}"), None).await;
    }

    for n in 0..20 {
        let data = assert_event!(bob.recv().await, "message");
        assert_eq!(data["message"], format!("msg-{n}"));
    }
}

#[tokio::test]
async fn test_delete_is_broadcast_and_idempotent() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    let room_id = alice.join("general").await;
    bob.join("general").await;

    alice.send_text(room_id, "oops", None).await;
    let message_id = assert_event!(alice.recv().await, "message")["_id"].clone();
    assert_event!(bob.recv().await, "message");

    for _ in 0..2 {
        alice
            .send_json(json!({"event": "delete", "data": {"messageId": message_id, "roomId": room_id}}))
            .await;
        for client in [&mut alice, &mut bob] {
            let data = assert_event!(client.recv().await, "deleted");
            assert_eq!(data["messageId"], message_id);
            assert_eq!(data["roomId"], json!(room_id));
        }
    }
}

#[tokio::test]
async fn test_delete_with_mismatched_room_is_rejected() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let general = alice.join("general").await;
    let random = alice.join("random").await;

    alice.send_text(general, "stay here", None).await;
    let message_id = assert_event!(alice.recv().await, "message")["_id"].clone();

    alice
        .send_json(json!({"event": "delete", "data": {"messageId": message_id, "roomId": random}}))
        .await;
    let data = assert_event!(alice.recv().await, "error");
    assert_contains!(data["message"].as_str().unwrap(), "does not belong");
}

#[tokio::test]
async fn test_delete_of_unknown_message_is_silent() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let room_id = alice.join("general").await;

    alice
        .send_json(json!({"event": "delete", "data": {"messageId": Uuid::new_v4(), "roomId": room_id}}))
        .await;
    alice.expect_silence(SILENCE).await;
}

#[tokio::test]
async fn test_typing_is_not_echoed_to_sender() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    let room_id = alice.join("general").await;
    bob.join("general").await;

    alice
        .send_json(json!({"event": "typing", "data": {"roomId": room_id, "isTyping": true}}))
        .await;

    let data = assert_event!(bob.recv().await, "typing");
    assert_eq!(data, json!({"roomId": room_id, "userId": "alice", "isTyping": true}));
    alice.expect_silence(SILENCE).await;
}

#[tokio::test]
async fn test_typing_reaches_other_tabs_of_same_user() {
    let server = TestServer::start().await;
    let mut first_tab = server.connect("alice").await;
    let mut second_tab = server.connect("alice").await;
    let room_id = first_tab.join("general").await;
    second_tab.join("general").await;

    first_tab
        .send_json(json!({"event": "typing", "data": {"roomId": room_id, "isTyping": false}}))
        .await;

    let data = assert_event!(second_tab.recv().await, "typing");
    assert_eq!(data["isTyping"], false);
    first_tab.expect_silence(SILENCE).await;
}

#[tokio::test]
async fn test_correlation_token_is_echoed() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    let room_id = alice.join("general").await;
    bob.join("general").await;

    alice.send_text(room_id, "optimistic", Some("tmp-42")).await;

    let own = assert_event!(alice.recv().await, "message");
    assert_eq!(own["correlationToken"], "tmp-42");
    assert_eq!(own["message"], "optimistic");
    assert!(own["_id"].is_string());
    assert!(own["createdAt"].is_string());

    let other = assert_event!(bob.recv().await, "message");
    assert_eq!(other["_id"], own["_id"]);
}

#[tokio::test]
async fn test_invalid_payloads_get_error_replies() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let room_id = alice.join("general").await;

    alice.send_raw("not json").await;
    let data = assert_event!(alice.recv().await, "error");
    assert_contains!(data["message"].as_str().unwrap(), "malformed");

    alice.send_text(room_id, "   ", Some("tmp-blank")).await;
    let data = assert_event!(alice.recv().await, "error");
    assert_eq!(data["correlationToken"], "tmp-blank");

    alice
        .send_json(json!({"event": "send", "data": {"roomId": room_id, "type": "file", "message": "x.pdf"}}))
        .await;
    let data = assert_event!(alice.recv().await, "error");
    assert_contains!(data["message"].as_str().unwrap(), "fileName");

    alice
        .send_json(json!({"event": "join", "data": {"slug": "two words"}}))
        .await;
    let data = assert_event!(alice.recv().await, "error");
    assert!(data.get("correlationToken").is_none());

    // The connection survives all of the above
    alice.send_text(room_id, "still here", None).await;
    assert_event!(alice.recv().await, "message");
}

#[tokio::test]
async fn test_code_message_gets_default_language() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let room_id = alice.join("general").await;

    alice
        .send_json(json!({"event": "send", "data": {"roomId": room_id, "type": "code", "message": "ls -la"}}))
        .await;

    let data = assert_event!(alice.recv().await, "message");
    assert_eq!(data["type"], "code");
    assert_eq!(data["meta"]["language"], "plaintext");
}

#[tokio::test]
async fn test_disconnect_leaves_room() {
    let server = TestServer::start().await;
    let mut alice = server.connect("alice").await;
    let mut bob = server.connect("bob").await;
    let room_id = alice.join("general").await;
    bob.join("general").await;

    bob.close().await;
    tokio::time::sleep(SILENCE).await;

    alice.send_text(room_id, "anyone?", None).await;
    assert_event!(alice.recv().await, "message");
}
