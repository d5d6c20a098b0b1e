/**
 * Router Configuration
 *
 * # Route Order
 *
 * 1. Chat routes (`/ws`)
 * 2. API routes (`/api/rooms/...`, `/health`)
 * 3. Fallback handler (JSON 404)
 *
 * Tracing and CORS layers wrap the whole router.
 */
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::backend::error::ChatError;
use crate::backend::routes::api_routes::configure_api_routes;
use crate::backend::routes::chat_routes::configure_chat_routes;
use crate::backend::server::state::AppState;

/// Create the Axum router with all routes configured
///
/// # Route Details
///
/// - `GET /ws` - Chat socket (token in header or `?token=`)
/// - `GET /api/rooms/{slug}` - Room record (Bearer auth)
/// - `GET /api/rooms/{slug}/messages` - Room history (Bearer auth)
/// - `GET /health` - Liveness and storage backend
pub fn create_router(app_state: AppState) -> Router<()> {
    let router = configure_chat_routes(Router::new());
    let router = configure_api_routes(router, app_state.clone());

    let router = router.fallback(|| async { ChatError::not_found("no such route") });

    router
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
