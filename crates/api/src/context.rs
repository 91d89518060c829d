use chrono::{DateTime, Utc};

use comicverse_auth::Identity;
use comicverse_core::{TokenId, UserId};

/// Authenticated caller for a request.
///
/// Inserted by the auth middleware; present on every protected route.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct UserContext {
    user_id: UserId,
    token_id: TokenId,
    expires_at: DateTime<Utc>,
}

impl UserContext {
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// The token that authenticated this request.
    pub fn token_id(&self) -> TokenId {
        self.token_id
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }
}

impl From<Identity> for UserContext {
    fn from(identity: Identity) -> Self {
        Self {
            user_id: identity.user_id,
            token_id: identity.token_id,
            expires_at: identity.expires_at,
        }
    }
}
