use chrono::{DateTime, SubsecRound, Utc};
use serde::Serialize;

use comicverse_core::{DomainError, DomainResult, UserId};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MAX_USERNAME_LEN: usize = 32;

/// A registered account.
///
/// Only the password hash is kept; it is never serialized.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// A new account with a fresh id. `username` must already be normalized.
    pub fn new(username: String, password_hash: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            username,
            password_hash,
            created_at: created_at.trunc_subsecs(6),
        }
    }
}

impl core::fmt::Debug for User {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Usernames are case-insensitive: trimmed, lowercased, then checked.
///
/// Accepted: 3..=32 ASCII letters, digits, `.`, `_` or `-`.
pub fn normalize_username(username: &str) -> DomainResult<String> {
    let username = username.trim().to_ascii_lowercase();
    if username.len() < MIN_USERNAME_LEN || username.len() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(format!(
            "username must be {MIN_USERNAME_LEN} to {MAX_USERNAME_LEN} characters"
        )));
    }
    let valid = username
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'));
    if !valid {
        return Err(DomainError::validation(
            "username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(username)
}
