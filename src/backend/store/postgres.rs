//! Postgres storage
//!
//! Tables are created by `migrations/0001_chat.sql`. `created_at` is taken
//! from `clock_timestamp()` and bumped past the newest row of the room, so
//! appends made under the engine's per-room lock are strictly ordered.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::backend::error::StoreError;
use crate::backend::store::{
    HistoryQuery, MembershipOracle, MessageStore, NewMessage, RoomDirectory,
};
use crate::shared::{ChatMessage, MessageType, Room, RoomSlug};

/// Attempts at inserting a new room before giving up
const ROOM_CREATE_ATTEMPTS: usize = 3;

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn load_members(&self, room_id: Uuid) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT user_id
            FROM room_members
            WHERE room_id = $1
            ORDER BY joined_at, user_id
            "#,
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| row.try_get::<String, _>("user_id").map_err(StoreError::from))
            .collect()
    }

    async fn room_from_row(&self, row: PgRow) -> Result<Room, StoreError> {
        let id: Uuid = row.try_get("id")?;
        Ok(Room {
            id,
            slug: row.try_get("slug")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            members: self.load_members(id).await?,
            created_at: row.try_get("created_at")?,
        })
    }
}

fn message_from_row(row: &PgRow) -> Result<ChatMessage, StoreError> {
    let kind: String = row.try_get("kind")?;
    let kind = kind
        .parse::<MessageType>()
        .map_err(|e| StoreError::corrupt(e.to_string()))?;

    Ok(ChatMessage {
        id: row.try_get("id")?,
        room: row.try_get("room_id")?,
        sender: row.try_get("sender")?,
        kind,
        message: row.try_get("body")?,
        meta: row.try_get("meta")?,
        created_at: row.try_get("created_at")?,
        deleted_at: row.try_get("deleted_at")?,
    })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait]
impl RoomDirectory for PgStore {
    async fn resolve_or_create(
        &self,
        slug: &RoomSlug,
        name: &str,
        description: Option<&str>,
    ) -> Result<Room, StoreError> {
        for _ in 0..ROOM_CREATE_ATTEMPTS {
            if let Some(room) = self.find_by_slug(slug.as_str()).await? {
                return Ok(room);
            }

            let inserted = sqlx::query(
                r#"
                INSERT INTO rooms (id, slug, name, description)
                VALUES ($1, $2, $3, $4)
                RETURNING id, slug, name, description, created_at
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(slug.as_str())
            .bind(name)
            .bind(description)
            .fetch_one(&self.pool)
            .await;

            match inserted {
                Ok(row) => {
                    let room = self.room_from_row(row).await?;
                    tracing::info!("[Store] Created room '{}' ({})", room.slug, room.id);
                    return Ok(room);
                }
                Err(e) if is_unique_violation(&e) => {
                    tracing::debug!("[Store] Lost creation race for '{}', re-reading", slug);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(StoreError::unavailable(format!(
            "could not resolve room '{slug}'"
        )))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, slug, name, description, created_at
            FROM rooms
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.room_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Room>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, slug, name, description, created_at
            FROM rooms
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.room_from_row(row).await?)),
            None => Ok(None),
        }
    }

    async fn add_member(&self, room_id: Uuid, user_id: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO room_members (room_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (room_id, user_id) DO NOTHING
            "#,
        )
        .bind(room_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn append(&self, message: NewMessage) -> Result<ChatMessage, StoreError> {
        let row = sqlx::query(
            r#"
            INSERT INTO messages (id, room_id, sender, kind, body, meta, created_at)
            VALUES (
                $1, $2, $3, $4, $5, $6,
                GREATEST(
                    clock_timestamp(),
                    (SELECT MAX(created_at) FROM messages WHERE room_id = $2)
                        + INTERVAL '1 microsecond'
                )
            )
            RETURNING id, room_id, sender, kind, body, meta, created_at, deleted_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(message.room)
        .bind(&message.sender)
        .bind(message.kind.as_str())
        .bind(&message.message)
        .bind(&message.meta)
        .fetch_one(&self.pool)
        .await?;

        message_from_row(&row)
    }

    async fn find(&self, id: Uuid) -> Result<Option<ChatMessage>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, room_id, sender, kind, body, meta, created_at, deleted_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    async fn soft_delete(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET deleted_at = clock_timestamp()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn history(&self, query: HistoryQuery) -> Result<Vec<ChatMessage>, StoreError> {
        let limit = i64::try_from(query.limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, room_id, sender, kind, body, meta, created_at, deleted_at
            FROM messages
            WHERE room_id = $1
              AND ($2::timestamptz IS NULL OR created_at < $2)
              AND ($3 OR deleted_at IS NULL)
            ORDER BY created_at DESC, id DESC
            LIMIT $4
            "#,
        )
        .bind(query.room)
        .bind(query.before)
        .bind(query.include_deleted)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut page = rows
            .iter()
            .map(message_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        page.reverse();
        Ok(page)
    }
}

#[async_trait]
impl MembershipOracle for PgStore {
    async fn is_authorized_for_team_room(
        &self,
        user_id: &str,
        team_id: &str,
    ) -> Result<bool, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM teams t
                WHERE t.id = $1
                  AND (
                    t.owner_id = $2
                    OR EXISTS (
                        SELECT 1
                        FROM team_members m
                        WHERE m.team_id = t.id
                          AND m.user_id = $2
                          AND m.status = 'accepted'
                    )
                  )
            ) AS authorized
            "#,
        )
        .bind(team_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.try_get("authorized")?)
    }
}
