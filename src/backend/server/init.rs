/**
 * Server Initialization
 *
 * # Initialization Process
 *
 * 1. Load the optional database (falls back to in-memory storage)
 * 2. Build the chat engine and room hub
 * 3. Create the router
 * 4. Start the periodic cleanup of idle broadcast channels
 */
use std::sync::Arc;

use axum::Router;

use crate::backend::auth::JwtKeys;
use crate::backend::chat::engine::ChatEngine;
use crate::backend::realtime::RoomHub;
use crate::backend::routes::router::create_router;
use crate::backend::server::config::{load_database, ServerConfig};
use crate::backend::server::state::AppState;
use crate::backend::store::{MemoryStore, Storage};

/// Create and configure the Axum application
///
/// Must be called inside a Tokio runtime: it spawns the channel janitor.
pub async fn create_app(config: &ServerConfig) -> Router<()> {
    tracing::info!("Initializing teamchat server");

    let storage = match load_database(config).await {
        Some(pool) => Storage::postgres(pool),
        None => Storage::memory(Arc::new(MemoryStore::new())),
    };
    tracing::info!("Using {} storage", storage.kind);

    let app_state = build_state(config, storage);
    spawn_channel_janitor(app_state.engine.hub().clone(), config);

    create_router(app_state)
}

/// Assemble the application state around a given storage bundle
pub fn build_state(config: &ServerConfig, storage: Storage) -> AppState {
    let engine = ChatEngine::new(storage, RoomHub::new(), config.limits());
    AppState::new(engine, JwtKeys::from_secret(&config.jwt_secret))
}

/// Router over a given storage bundle, without background tasks
pub fn build_app(config: &ServerConfig, storage: Storage) -> Router<()> {
    create_router(build_state(config, storage))
}

fn spawn_channel_janitor(hub: RoomHub, config: &ServerConfig) {
    let period = config.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let removed = hub.cleanup_inactive_channels();
            tracing::debug!("[Realtime] Cleaned up {} inactive room channels", removed);
        }
    });
    tracing::info!("Router configured with periodic cleanup task");
}
