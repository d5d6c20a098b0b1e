/**
 * Room Records and Slugs
 *
 * A room is addressed by a stable slug. Slugs of the form `team-<teamId>`
 * are team-scoped: only the team's owner and accepted members may join
 * them. Any other slug is an open room for authenticated users.
 */
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::shared::error::SharedError;

/// Prefix marking a team-scoped room slug
pub const TEAM_ROOM_PREFIX: &str = "team-";

/// Longest slug accepted from clients
pub const MAX_SLUG_LEN: usize = 128;

/// A chat room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Globally unique lookup key
    pub slug: String,
    /// Display name
    pub name: String,
    pub description: Option<String>,
    /// User IDs that have joined the room
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Room {
    pub fn has_member(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member == user_id)
    }
}

/// A validated room slug
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomSlug(String);

impl RoomSlug {
    /// Validate a client-supplied slug
    ///
    /// The slug must be non-empty, at most `MAX_SLUG_LEN` characters, and
    /// contain no whitespace.
    pub fn parse(raw: &str) -> Result<Self, SharedError> {
        if raw.is_empty() {
            return Err(SharedError::validation("slug", "must not be empty"));
        }
        if raw.chars().count() > MAX_SLUG_LEN {
            return Err(SharedError::validation(
                "slug",
                format!("must be at most {MAX_SLUG_LEN} characters"),
            ));
        }
        if raw.chars().any(char::is_whitespace) {
            return Err(SharedError::validation("slug", "must not contain whitespace"));
        }
        Ok(Self(raw.to_string()))
    }

    /// Slug of the room belonging to `team_id`
    pub fn for_team(team_id: &str) -> Self {
        Self(format!("{TEAM_ROOM_PREFIX}{team_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Team ID for a team-scoped slug, `None` for open rooms
    ///
    /// A bare `team-` prefix still counts as team-scoped, with an empty
    /// team ID that no team can match.
    pub fn team_id(&self) -> Option<&str> {
        self.0.strip_prefix(TEAM_ROOM_PREFIX)
    }

    pub fn is_team_scoped(&self) -> bool {
        self.team_id().is_some()
    }
}

impl fmt::Display for RoomSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
