/**
 * Socket Connection Loop
 *
 * One connection runs two tasks:
 *
 * - the read loop (this function) parses text frames and hands commands
 *   to the engine one at a time, in arrival order
 * - a writer task owns the socket sink and drains the session outbox
 *
 * The outbox is bounded. A client that stops reading fills it, and the
 * connection is closed instead of buffering without limit.
 *
 * The connection ends when the client closes, the socket errors, or the
 * writer can no longer send. Dropping the session releases every room
 * subscription; nothing is broadcast on disconnect.
 */
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};

use crate::backend::auth::Identity;
use crate::backend::chat::engine::ChatEngine;
use crate::backend::chat::session::{Outbox, Session, OUTBOX_CAPACITY};
use crate::shared::{ClientCommand, ServerEvent};

pub async fn run_connection(socket: WebSocket, engine: ChatEngine, identity: Identity) {
    let (mut sink, mut stream) = socket.split();
    let (outbox, mut outbox_rx) = Outbox::bounded(OUTBOX_CAPACITY);
    let mut session = Session::new(identity, outbox.clone());
    let connection = session.id();

    tracing::info!(
        "[Socket] Connection {} opened for user {}",
        connection,
        session.user_id()
    );

    let mut writer = tokio::spawn(async move {
        while let Some(event) = outbox_rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("[Socket] Failed to encode '{}' event: {}", event.name(), e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    handle_text(&engine, &mut session, text.as_str()).await;
                }
                Some(Ok(Message::Binary(_))) => {
                    tracing::debug!("[Socket] Ignoring binary frame on {}", connection);
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::debug!("[Socket] Read error on {}: {}", connection, e);
                    break;
                }
            },
            _ = &mut writer => {
                tracing::debug!("[Socket] Writer for {} stopped", connection);
                break;
            }
            _ = outbox.overflowed() => {
                tracing::warn!("[Socket] Connection {} is not reading, closing", connection);
                break;
            }
        }
    }

    let rooms = session.joined_rooms().count();
    drop(session);
    writer.abort();

    tracing::info!(
        "[Socket] Connection {} closed, left {} rooms",
        connection,
        rooms
    );
}

/// Parse and run one text frame
///
/// Malformed frames are answered with an `error` event.
pub async fn handle_text(engine: &ChatEngine, session: &mut Session, text: &str) {
    match serde_json::from_str::<ClientCommand>(text) {
        Ok(command) => engine.handle(session, command).await,
        Err(e) => {
            tracing::warn!("[Socket] Malformed frame from {}: {}", session.user_id(), e);
            session.reply(ServerEvent::error(format!("malformed command: {e}")));
        }
    }
}
