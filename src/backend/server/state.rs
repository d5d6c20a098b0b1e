/**
 * Application State
 *
 * `AppState` is the single state value handed to the router. The
 * `FromRef` implementations let handlers extract only the part they need.
 *
 * # Thread Safety
 *
 * - `ChatEngine` is cheap to clone; its storage is `Arc<dyn ...>` and its
 *   `RoomHub` is an `Arc` around a mutex-guarded map
 * - `JwtKeys` is read-only after startup
 */
use std::sync::Arc;

use axum::extract::FromRef;

use crate::backend::auth::JwtKeys;
use crate::backend::chat::engine::ChatEngine;
use crate::backend::store::StorageKind;

#[derive(Clone)]
pub struct AppState {
    /// Chat session engine (storage, room hub, limits)
    pub engine: ChatEngine,

    /// Keys for verifying bearer tokens
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(engine: ChatEngine, jwt: JwtKeys) -> Self {
        Self {
            engine,
            jwt: Arc::new(jwt),
        }
    }

    pub fn storage_kind(&self) -> StorageKind {
        self.engine.storage().kind
    }
}

impl FromRef<AppState> for ChatEngine {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.engine.clone()
    }
}

impl FromRef<AppState> for Arc<JwtKeys> {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.jwt.clone()
    }
}
