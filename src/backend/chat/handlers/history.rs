/**
 * Room History Handlers
 *
 * Request/response reads for catching up on a room. Both routes sit behind
 * `auth_middleware` and require the caller to be a member of the room.
 */
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::backend::chat::engine::{ChatEngine, HistoryParams};
use crate::backend::error::ChatError;
use crate::backend::middleware::AuthUser;
use crate::shared::{HistoryPage, Room};

/// Query string of a history request
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQueryParams {
    /// Only messages created strictly before this instant
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub include_deleted: bool,
}

/// Fetch a page of room history (GET /api/rooms/{slug}/messages)
///
/// # Query Parameters
///
/// - `before` - RFC 3339 cursor, usually the previous page's `nextCursor`
/// - `limit` - page size, clamped to the configured bounds
/// - `includeDeleted` - include soft-deleted messages (with `deletedAt`)
///
/// # Returns
///
/// `{messages, nextCursor}` with messages oldest-first. `nextCursor` is
/// `null` when there is nothing older.
pub async fn get_room_history(
    State(engine): State<ChatEngine>,
    AuthUser(identity): AuthUser,
    Path(slug): Path<String>,
    query: Result<Query<HistoryQueryParams>, QueryRejection>,
) -> Result<Json<HistoryPage>, ChatError> {
    let Query(query) = query.map_err(|e| ChatError::validation(e.body_text()))?;

    let page = engine
        .history(
            &identity.id,
            &slug,
            HistoryParams {
                before: query.before,
                limit: query.limit,
                include_deleted: query.include_deleted,
            },
        )
        .await?;

    tracing::debug!(
        "[Http] History for '{}': {} messages for user {}",
        slug,
        page.messages.len(),
        identity.id
    );

    Ok(Json(page))
}

/// Fetch a room record (GET /api/rooms/{slug})
pub async fn get_room(
    State(engine): State<ChatEngine>,
    AuthUser(identity): AuthUser,
    Path(slug): Path<String>,
) -> Result<Json<Room>, ChatError> {
    let room = engine.room_for_member(&identity.id, &slug).await?;
    Ok(Json(room))
}
