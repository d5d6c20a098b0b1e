//! Authentication Module
//!
//! Verifies the bearer credential presented when a client connects. Token
//! issuance belongs to the wider application; this module only checks
//! tokens signed with the shared secret (and can mint them for tests and
//! tooling).
//!
//! # Module Structure
//!
//! ```text
//! auth/
//! ├── mod.rs      - Module exports and documentation
//! └── sessions.rs - JWT keys, identity normalization, credential extraction
//! ```
//!
//! # Authentication Flow
//!
//! 1. **Extract**: `Authorization` header or `?token=` query parameter,
//!    with an optional `Bearer ` label
//! 2. **Verify**: HS256 signature and `exp` against `JWT_SECRET`
//! 3. **Normalize**: user id taken from the first of `id`, `_id`,
//!    `userId`, `sub`
//!
//! Any failure refuses the connection with 401. There is no anonymous
//! fallback.

/// JWT verification and identity normalization
pub mod sessions;

pub use sessions::{credential_from_handshake, Identity, JwtKeys, USER_ID_CLAIMS};
