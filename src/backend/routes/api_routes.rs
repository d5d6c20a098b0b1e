/**
 * API Routes
 *
 * ## Rooms (Bearer auth)
 * - `GET /api/rooms/{slug}` - Room record
 * - `GET /api/rooms/{slug}/messages` - Room history
 *
 * ## Health (public)
 * - `GET /health` - Liveness and storage backend in use
 */
use axum::{extract::State, middleware, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::backend::chat::handlers::{get_room, get_room_history};
use crate::backend::middleware::auth_middleware;
use crate::backend::server::state::AppState;

pub fn configure_api_routes(router: Router<AppState>, app_state: AppState) -> Router<AppState> {
    let rooms = Router::new()
        .route("/api/rooms/{slug}", get(get_room))
        .route("/api/rooms/{slug}/messages", get(get_room_history))
        .route_layer(middleware::from_fn_with_state(app_state, auth_middleware));

    router.merge(rooms).route("/health", get(health))
}

/// Liveness probe (GET /health)
pub async fn health(State(app_state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "storage": app_state.storage_kind().to_string(),
    }))
}
