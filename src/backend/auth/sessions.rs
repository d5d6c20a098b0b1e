/**
 * Session Tokens and Identity
 *
 * Connections are authenticated once, at handshake, by an HS256 JWT. The
 * claims are kept as a free-form map because issuers disagree on where the
 * user id lives; `Identity::from_claims` picks it out.
 */
use std::time::Duration;

use axum::http::{header::AUTHORIZATION, HeaderMap};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::{Map, Value};

use crate::backend::error::AuthError;

/// Claims checked, in order, for the user id
pub const USER_ID_CLAIMS: [&str; 4] = ["id", "_id", "userId", "sub"];

/// Values some clients send when they have no token
const PLACEHOLDER_TOKENS: [&str; 2] = ["null", "undefined"];

/// Authenticated user bound to a connection or request
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    /// Normalized user id
    pub id: String,
    /// All verified claims
    pub claims: Map<String, Value>,
}

impl Identity {
    /// Build an identity from verified claims
    ///
    /// String ids are used as-is (when non-empty) and numeric ids are
    /// rendered in decimal.
    pub fn from_claims(claims: Map<String, Value>) -> Result<Self, AuthError> {
        let id = USER_ID_CLAIMS
            .iter()
            .find_map(|key| match claims.get(*key) {
                Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
            .ok_or(AuthError::MissingUserId)?;

        Ok(Self { id, claims })
    }
}

/// Signing and verification keys derived from the shared secret
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtKeys").finish_non_exhaustive()
    }
}

impl JwtKeys {
    pub fn from_secret(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Create a token for `user_id` valid for `ttl`
    ///
    /// The id is written to both `id` and `sub`.
    pub fn create_token(&self, user_id: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX / 2);

        let mut claims = Map::new();
        claims.insert("id".into(), Value::String(user_id.to_string()));
        claims.insert("sub".into(), Value::String(user_id.to_string()));
        claims.insert("iat".into(), Value::from(now));
        claims.insert("exp".into(), Value::from(now.saturating_add(ttl_secs)));

        self.sign(&claims)
    }

    /// Sign an arbitrary claim set
    pub fn sign(&self, claims: &Map<String, Value>) -> Result<String, AuthError> {
        encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
            .map_err(|e| AuthError::Issue(e.to_string()))
    }

    /// Verify a token and normalize its identity
    pub fn verify_token(&self, token: &str) -> Result<Identity, AuthError> {
        let data = decode::<Map<String, Value>>(token, &self.decoding, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        Identity::from_claims(data.claims)
    }
}

/// Pick the credential out of a handshake
///
/// The `Authorization` header wins over the `token` query parameter. A
/// `Bearer ` label is stripped. Empty values and the placeholders `null`
/// and `undefined` count as absent.
pub fn credential_from_handshake(
    headers: &HeaderMap,
    query_token: Option<&str>,
) -> Result<String, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    [header, query_token]
        .into_iter()
        .flatten()
        .map(strip_scheme)
        .find(|token| is_usable(token))
        .map(str::to_string)
        .ok_or(AuthError::MissingCredential)
}

fn strip_scheme(raw: &str) -> &str {
    let raw = raw.trim_start();
    let token = match raw.get(..7) {
        Some(prefix) if prefix.eq_ignore_ascii_case("bearer ") => &raw[7..],
        _ => raw,
    };
    token.trim()
}

fn is_usable(token: &str) -> bool {
    !token.is_empty() && !PLACEHOLDER_TOKENS.contains(&token)
}
