//! Socket handshake authentication

use serde_json::json;
use tokio_tungstenite::tungstenite;

use crate::common::*;

fn assert_unauthorized(result: Result<WsClient, tungstenite::Error>) {
    match result {
        Err(tungstenite::Error::Http(response)) => assert_eq!(response.status().as_u16(), 401),
        Err(other) => panic!("Expected HTTP 401, got {other:?}"),
        Ok(_) => panic!("Expected the handshake to be rejected"),
    }
}

#[tokio::test]
async fn test_missing_credential_is_rejected() {
    let server = TestServer::start().await;
    assert_unauthorized(server.connect_without_credential().await);
}

#[tokio::test]
async fn test_placeholder_tokens_are_rejected() {
    let server = TestServer::start().await;
    assert_unauthorized(server.connect_with_header("Bearer null").await);
    assert_unauthorized(server.connect_with_header("Bearer undefined").await);
    assert_unauthorized(server.connect_with_query("null").await);
}

#[tokio::test]
async fn test_bad_signature_is_rejected() {
    let server = TestServer::start().await;
    let forged = teamchat::backend::auth::JwtKeys::from_secret("someone-else")
        .create_token("mallory", std::time::Duration::from_secs(60))
        .unwrap();
    assert_unauthorized(server.connect_with_header(&auth_header(&forged)).await);
}

#[tokio::test]
async fn test_token_without_user_id_is_rejected() {
    let server = TestServer::start().await;
    let exp = chrono::Utc::now().timestamp() + 60;
    let token = token_with_claims(json!({"email": "a@example.com", "exp": exp}));
    assert_unauthorized(server.connect_with_header(&auth_header(&token)).await);
}

#[tokio::test]
async fn test_query_token_is_accepted() {
    let server = TestServer::start().await;
    let mut client = assert_ok!(server.connect_with_query(&token_for("alice")).await);
    client.join("general").await;
    client.close().await;
}

#[tokio::test]
async fn test_alternate_id_claim_is_used() {
    let server = TestServer::start().await;
    let exp = chrono::Utc::now().timestamp() + 60;
    let token = token_with_claims(json!({"_id": "64f0c2", "exp": exp}));

    let mut client = assert_ok!(server.connect_with_header(&auth_header(&token)).await);
    let room_id = client.join("general").await;
    client.send_text(room_id, "hello", None).await;

    let data = assert_event!(client.recv().await, "message");
    assert_eq!(data["sender"], "64f0c2");
}
