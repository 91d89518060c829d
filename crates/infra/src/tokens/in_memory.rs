use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use comicverse_auth::{Token, TokenRepository};
use comicverse_core::{RepositoryError, TokenId, UserId};

use crate::db::poisoned;

/// In-memory token store.
///
/// Intended for tests/dev. Tokens are lost on restart, which together with an
/// ephemeral key pair means every token dies with the process.
#[derive(Debug, Default)]
pub struct InMemoryTokenRepository {
    tokens: RwLock<HashMap<TokenId, Token>>,
}

impl InMemoryTokenRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stored record, if any.
    pub fn get(&self, token_id: TokenId) -> Option<Token> {
        self.tokens.read().ok()?.get(&token_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tokens.read().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TokenRepository for InMemoryTokenRepository {
    async fn save(&self, token: &Token) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        tokens.entry(token.id()).or_insert_with(|| token.clone());
        Ok(())
    }

    async fn is_revoked(&self, token_id: TokenId) -> Result<bool, RepositoryError> {
        let tokens = self.tokens.read().map_err(|_| poisoned())?;
        Ok(tokens.get(&token_id).is_none_or(Token::is_revoked))
    }

    async fn revoke(&self, token_id: TokenId) -> Result<(), RepositoryError> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        if let Some(token) = tokens.remove(&token_id) {
            tokens.insert(token_id, token.into_revoked());
        }
        Ok(())
    }

    async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
        let mut tokens = self.tokens.write().map_err(|_| poisoned())?;
        let mut revoked = 0;
        for token in tokens.values_mut() {
            if token.user_id() == user_id && !token.is_revoked() {
                *token = token.clone().into_revoked();
                revoked += 1;
            }
        }
        Ok(revoked)
    }
}
