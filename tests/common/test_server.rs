//! In-process test server and socket client
//!
//! `TestServer` binds the real router on an ephemeral port over a fresh
//! `MemoryStore`. `WsClient` speaks the `{event, data}` frame protocol.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use teamchat::backend::server::{build_app, ServerConfig};
use teamchat::backend::store::{MemoryStore, Storage};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use super::auth_helpers::{auth_header, token_for, TEST_SECRET};

/// How long `recv` waits for a frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

pub fn test_config() -> ServerConfig {
    ServerConfig::builder()
        .jwt_secret(TEST_SECRET)
        .history_page_size(30)
        .history_max_page_size(100)
        .build()
        .expect("Failed to build test config")
}

/// Router over a fresh in-memory store, for `oneshot` requests
pub fn test_app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let app = build_app(&test_config(), Storage::memory(store.clone()));
    (app, store)
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub async fn start() -> Self {
        let (app, store) = test_app();
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("Listener has no address");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            addr,
            store,
            handle,
        }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Connect as `user_id` with a Bearer header
    pub async fn connect(&self, user_id: &str) -> WsClient {
        let token = token_for(user_id);
        self.connect_with_header(&auth_header(&token))
            .await
            .expect("Handshake rejected")
    }

    pub async fn connect_with_header(&self, authorization: &str) -> Result<WsClient, tungstenite::Error> {
        let mut request = self.ws_url().into_client_request()?;
        let value = HeaderValue::from_str(authorization).expect("Invalid header value");
        request.headers_mut().insert("authorization", value);
        let (stream, _) = connect_async(request).await?;
        Ok(WsClient { stream })
    }

    /// Connect with the token in the query string
    pub async fn connect_with_query(&self, token: &str) -> Result<WsClient, tungstenite::Error> {
        let url = format!("{}?token={}", self.ws_url(), token);
        let (stream, _) = connect_async(url).await?;
        Ok(WsClient { stream })
    }

    pub async fn connect_without_credential(&self) -> Result<WsClient, tungstenite::Error> {
        let (stream, _) = connect_async(self.ws_url()).await?;
        Ok(WsClient { stream })
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn send_json(&mut self, value: Value) {
        self.send_raw(&value.to_string()).await;
    }

    pub async fn send_raw(&mut self, text: &str) {
        self.stream
            .send(Message::text(text))
            .await
            .expect("Failed to send frame");
    }

    /// Next text frame as JSON; panics after `RECV_TIMEOUT`
    pub async fn recv(&mut self) -> Value {
        match self.try_recv(RECV_TIMEOUT).await {
            Some(frame) => frame,
            None => panic!("No frame received within {:?}", RECV_TIMEOUT),
        }
    }

    /// Assert that nothing arrives within `window`
    pub async fn expect_silence(&mut self, window: Duration) {
        if let Some(frame) = self.try_recv(window).await {
            panic!("Expected silence, got {}", frame);
        }
    }

    async fn try_recv(&mut self, window: Duration) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + window;
        loop {
            let next = tokio::time::timeout_at(deadline, self.stream.next()).await.ok()??;
            match next.expect("Socket error") {
                Message::Text(text) => {
                    return Some(serde_json::from_str(text.as_str()).expect("Frame is not JSON"))
                }
                Message::Close(_) => return None,
                _ => continue,
            }
        }
    }

    /// Join `slug` and return the room id from the `joined` reply
    pub async fn join(&mut self, slug: &str) -> Uuid {
        self.send_json(json!({"event": "join", "data": {"slug": slug}}))
            .await;
        let data = assert_event!(self.recv().await, "joined");
        assert_eq!(data["slug"], slug);
        serde_json::from_value(data["roomId"].clone()).expect("roomId is not a UUID")
    }

    pub async fn send_text(&mut self, room_id: Uuid, text: &str, token: Option<&str>) {
        let mut data = json!({"roomId": room_id, "type": "text", "message": text});
        if let Some(token) = token {
            data["correlationToken"] = json!(token);
        }
        self.send_json(json!({"event": "send", "data": data})).await;
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}
