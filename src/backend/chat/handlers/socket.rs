/**
 * Socket Upgrade Handler
 *
 * `GET /ws` upgrades to the chat socket. The credential is checked before
 * the upgrade: a missing or invalid token is answered with 401 and no
 * socket is opened.
 *
 * # Credential Carriers
 *
 * - `Authorization: Bearer <token>` header
 * - `?token=<token>` query parameter (browsers cannot set headers on a
 *   WebSocket handshake)
 */
use axum::{
    extract::{Query, State, WebSocketUpgrade},
    http::HeaderMap,
    response::Response,
};
use serde::Deserialize;

use crate::backend::auth::credential_from_handshake;
use crate::backend::chat::connection::run_connection;
use crate::backend::error::ChatError;
use crate::backend::server::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SocketQuery {
    pub token: Option<String>,
}

/// Handle the socket handshake (GET /ws)
pub async fn handle_socket_upgrade(
    State(app_state): State<AppState>,
    Query(query): Query<SocketQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ChatError> {
    let token = credential_from_handshake(&headers, query.token.as_deref()).map_err(|e| {
        tracing::warn!("[Socket] Handshake without credential");
        ChatError::from(e)
    })?;

    let identity = app_state.jwt.verify_token(&token).map_err(|e| {
        tracing::warn!("[Socket] Handshake rejected: {}", e);
        ChatError::from(e)
    })?;

    tracing::debug!("[Socket] Handshake accepted for user {}", identity.id);
    let engine = app_state.engine.clone();

    Ok(ws.on_upgrade(move |socket| run_connection(socket, engine, identity)))
}
