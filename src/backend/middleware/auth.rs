/**
 * Authentication Middleware
 *
 * Protects the HTTP API. The bearer token is taken from the
 * `Authorization` header, verified with the server's JWT keys, and the
 * resulting `Identity` is attached to the request extensions for the
 * `AuthUser` extractor.
 */
use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};

use crate::backend::auth::{credential_from_handshake, Identity};
use crate::backend::error::ChatError;
use crate::backend::server::state::AppState;

/// Authentication middleware
///
/// Returns 401 with a JSON error body when the token is missing or invalid.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ChatError> {
    let token = credential_from_handshake(request.headers(), None).map_err(|e| {
        tracing::warn!("[Auth] Missing Authorization header");
        ChatError::from(e)
    })?;

    let identity = app_state.jwt.verify_token(&token).map_err(|e| {
        tracing::warn!("[Auth] Rejected token: {}", e);
        ChatError::from(e)
    })?;

    tracing::debug!("[Auth] Authenticated user {}", identity.id);
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}

/// Axum extractor for the authenticated user
///
/// Only valid on routes behind `auth_middleware`.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ChatError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| {
                tracing::warn!("[Auth] Identity not found in request extensions");
                ChatError::unauthenticated("authentication required")
            })
    }
}
