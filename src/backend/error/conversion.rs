/**
 * Error Conversion
 *
 * # Response Format
 *
 * ```json
 * {
 *   "error": "Error message",
 *   "status": 400
 * }
 * ```
 */
use axum::{
    response::{IntoResponse, Response},
    Json,
};

use crate::backend::error::types::ChatError;
use crate::shared::ServerEvent;

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_internal() {
            tracing::error!("[Http] Request failed: {}", self);
        }

        let body = serde_json::json!({
            "error": self.message(),
            "status": status.as_u16(),
        });

        (status, Json(body)).into_response()
    }
}

impl ChatError {
    /// Socket form of an error, sent to the requester only
    ///
    /// `correlation_token` is the token of the failed `send`, if any.
    pub fn to_event(&self, correlation_token: Option<String>) -> ServerEvent {
        ServerEvent::error_for(self.message(), correlation_token)
    }
}
