/**
 * Chat Routes
 *
 * - `GET /ws` - Chat socket upgrade
 *
 * The socket route is not behind `auth_middleware`; the upgrade handler
 * authenticates itself so that `?token=` works for browsers.
 */
use axum::{routing::get, Router};

use crate::backend::chat::handlers::handle_socket_upgrade;
use crate::backend::server::state::AppState;

pub fn configure_chat_routes(router: Router<AppState>) -> Router<AppState> {
    router.route("/ws", get(handle_socket_upgrade))
}
