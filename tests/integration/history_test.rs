//! Room history and room lookup over HTTP

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use teamchat::backend::store::{MemberSlot, MemoryStore, MessageStore, NewMessage, RoomDirectory, Team};
use teamchat::shared::{MessageType, Room, RoomSlug};
use tower::ServiceExt;
use uuid::Uuid;

use crate::common::*;

async fn get(app: &Router, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
    let mut request = Request::builder().uri(uri);
    if let Some(token) = token {
        request = request.header("authorization", auth_header(token));
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn seed_room(store: &MemoryStore, slug: &str, member: &str, count: usize) -> (Room, Vec<Uuid>) {
    let room = store
        .resolve_or_create(&RoomSlug::parse(slug).unwrap(), slug, None)
        .await
        .unwrap();
    store.add_member(room.id, member).await.unwrap();

    let mut ids = Vec::new();
    for n in 0..count {
        let stored = store
            .append(NewMessage {
                room: room.id,
                sender: member.to_string(),
                kind: MessageType::Text,
                message: format!("msg-{n}"),
                meta: json!({}),
            })
            .await
            .unwrap();
        ids.push(stored.id);
    }
    (room, ids)
}

fn bodies(page: &Value) -> Vec<String> {
    page["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["message"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_history_pages_back_without_overlap() {
    let (app, store) = test_app();
    seed_room(&store, "general", "alice", 45).await;
    let token = token_for("alice");

    let (status, first) = get(&app, "/api/rooms/general/messages?limit=20", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let expected: Vec<String> = (25..45).map(|n| format!("msg-{n}")).collect();
    assert_eq!(bodies(&first), expected);
    assert_eq!(first["nextCursor"], first["messages"][0]["createdAt"]);

    let cursor = first["nextCursor"].as_str().unwrap();
    let uri = format!("/api/rooms/general/messages?limit=20&before={cursor}");
    let (_, second) = get(&app, &uri, Some(&token)).await;
    let expected: Vec<String> = (5..25).map(|n| format!("msg-{n}")).collect();
    assert_eq!(bodies(&second), expected);

    let cursor = second["nextCursor"].as_str().unwrap();
    let uri = format!("/api/rooms/general/messages?limit=20&before={cursor}");
    let (_, last) = get(&app, &uri, Some(&token)).await;
    assert_eq!(bodies(&last).len(), 5);
    assert_eq!(last["nextCursor"], Value::Null);
}

#[tokio::test]
async fn test_history_limit_is_clamped() {
    let (app, store) = test_app();
    seed_room(&store, "general", "alice", 120).await;
    let token = token_for("alice");

    let (_, default_page) = get(&app, "/api/rooms/general/messages", Some(&token)).await;
    assert_eq!(bodies(&default_page).len(), 30);

    let (_, big_page) = get(&app, "/api/rooms/general/messages?limit=500", Some(&token)).await;
    assert_eq!(bodies(&big_page).len(), 100);
}

#[tokio::test]
async fn test_deleted_messages_are_hidden_unless_requested() {
    let (app, store) = test_app();
    let (_, ids) = seed_room(&store, "general", "alice", 3).await;
    assert!(store.soft_delete(ids[1]).await.unwrap());
    let token = token_for("alice");

    let (_, page) = get(&app, "/api/rooms/general/messages", Some(&token)).await;
    assert_eq!(bodies(&page), vec!["msg-0", "msg-2"]);

    let (_, page) = get(&app, "/api/rooms/general/messages?includeDeleted=true", Some(&token)).await;
    assert_eq!(bodies(&page), vec!["msg-0", "msg-1", "msg-2"]);
    assert!(page["messages"][1]["deletedAt"].is_string());
    assert!(page["messages"][0].get("deletedAt").is_none());
}

#[tokio::test]
async fn test_history_requires_membership() {
    let (app, store) = test_app();
    seed_room(&store, "general", "alice", 1).await;

    let (status, body) = get(&app, "/api/rooms/general/messages", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["status"], 401);

    let (status, _) = get(&app, "/api/rooms/general/messages", Some("garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = get(&app, "/api/rooms/general/messages", Some(&token_for("bob"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = get(&app, "/api/rooms/nowhere/messages", Some(&token_for("alice"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_team_history_follows_team_membership() {
    let (app, store) = test_app();
    store
        .insert_team(Team {
            id: "T1".to_string(),
            owner: "owner".to_string(),
            members: vec![MemberSlot::accepted("member")],
        })
        .await;
    seed_room(&store, "team-T1", "owner", 2).await;

    // Accepted members may read even before their first join
    let (status, page) = get(&app, "/api/rooms/team-T1/messages", Some(&token_for("member"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(bodies(&page).len(), 2);

    let (status, _) = get(&app, "/api/rooms/team-T1/messages", Some(&token_for("outsider"))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_bad_query_is_rejected() {
    let (app, store) = test_app();
    seed_room(&store, "general", "alice", 1).await;
    let token = token_for("alice");

    let (status, body) = get(&app, "/api/rooms/general/messages?before=yesterday", Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_get_room_record() {
    let (app, store) = test_app();
    let (room, _) = seed_room(&store, "general", "alice", 0).await;

    let (status, body) = get(&app, "/api/rooms/general", Some(&token_for("alice"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], json!(room.id));
    assert_eq!(body["slug"], "general");
    assert_eq!(body["members"], json!(["alice"]));
}

#[tokio::test]
async fn test_health_and_fallback() {
    let (app, _) = test_app();

    let (status, body) = get(&app, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"status": "ok", "storage": "memory"}));

    let (status, body) = get(&app, "/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
}
