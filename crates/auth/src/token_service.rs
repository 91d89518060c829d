//! Token issuance, verification and revocation.

use chrono::{DateTime, Utc};
use ed25519_dalek::VerifyingKey;
use tracing::{debug, info, warn};

use comicverse_core::{RepositoryError, RequestScope, TokenId, UserId};

use crate::token::validate_window;
use crate::{KeyPair, Token, TokenConfig, TokenError, TokenPolicy, TokenRepository};

/// Issues and verifies signed identity tokens.
///
/// Verification is pure signature math plus exactly one repository call (the
/// revocation lookup), made only after signature and expiry checks pass.
/// Nothing is cached here: a revocation is visible to every verification
/// that starts after [`TokenService::revoke`] returns.
pub struct TokenService<R> {
    keys: KeyPair,
    policy: TokenPolicy,
    repository: R,
}

impl<R> TokenService<R>
where
    R: TokenRepository,
{
    pub fn new(config: TokenConfig, repository: R) -> Self {
        Self {
            keys: config.keys,
            policy: config.policy,
            repository,
        }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.policy
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        self.keys.verifying_key()
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Issue a token for `user_id`, valid from now for the policy TTL.
    pub async fn issue(&self, user_id: UserId, scope: &RequestScope) -> Result<Token, TokenError> {
        self.issue_at(user_id, Utc::now(), scope).await
    }

    pub async fn issue_at(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        scope: &RequestScope,
    ) -> Result<Token, TokenError> {
        // The wire format carries millisecond timestamps.
        let issued_at = DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);
        let expires_at = issued_at + self.policy.ttl();

        let token = Token::sign(
            TokenId::new(),
            user_id,
            issued_at,
            expires_at,
            self.keys.signing_key(),
        );

        scope
            .run(self.repository.save(&token))
            .await?
            .map_err(|e| storage_failure("save", e))?;

        info!(
            token_id = %token.id(),
            user_id = %user_id,
            expires_at = %expires_at,
            "token issued"
        );
        Ok(token)
    }

    /// Verify an encoded token and return the identity it carries.
    pub async fn verify(&self, encoded: &str, scope: &RequestScope) -> Result<UserId, TokenError> {
        self.verify_at(encoded, Utc::now(), scope).await
    }

    pub async fn verify_at(
        &self,
        encoded: &str,
        now: DateTime<Utc>,
        scope: &RequestScope,
    ) -> Result<UserId, TokenError> {
        self.authenticate_at(encoded, now, scope)
            .await
            .map(|token| token.user_id())
    }

    /// Like [`TokenService::verify`], returning the whole token.
    pub async fn authenticate(
        &self,
        encoded: &str,
        scope: &RequestScope,
    ) -> Result<Token, TokenError> {
        self.authenticate_at(encoded, Utc::now(), scope).await
    }

    pub async fn authenticate_at(
        &self,
        encoded: &str,
        now: DateTime<Utc>,
        scope: &RequestScope,
    ) -> Result<Token, TokenError> {
        let token = self.verify_signature(encoded)?;

        if let Err(e) = validate_window(&token, now, self.policy.clock_skew()) {
            debug!(token_id = %token.id(), reason = %e, "token rejected");
            return Err(e);
        }

        let revoked = scope
            .run(self.repository.is_revoked(token.id()))
            .await?
            .map_err(|e| storage_failure("is_revoked", e))?;
        if revoked {
            debug!(token_id = %token.id(), "token rejected: revoked");
            return Err(TokenError::Revoked);
        }

        Ok(token)
    }

    /// Decode `encoded` and check its signature only. Expiry and revocation
    /// are not consulted; no I/O.
    pub fn verify_signature(&self, encoded: &str) -> Result<Token, TokenError> {
        Token::decode_verified(encoded, self.keys.verifying_key()).map_err(|reason| {
            debug!(?reason, "token rejected: bad signature or encoding");
            TokenError::InvalidSignature
        })
    }

    /// Revoke a token by id. Idempotent.
    pub async fn revoke(&self, token_id: TokenId, scope: &RequestScope) -> Result<(), TokenError> {
        scope
            .run(self.repository.revoke(token_id))
            .await?
            .map_err(|e| storage_failure("revoke", e))?;

        info!(token_id = %token_id, "token revoked");
        Ok(())
    }

    /// Administrative revocation of every token a user holds.
    pub async fn revoke_all_for_user(
        &self,
        user_id: UserId,
        scope: &RequestScope,
    ) -> Result<u64, TokenError> {
        let revoked = scope
            .run(self.repository.revoke_all_for_user(user_id))
            .await?
            .map_err(|e| storage_failure("revoke_all_for_user", e))?;

        info!(user_id = %user_id, revoked, "user tokens revoked");
        Ok(revoked)
    }
}

fn storage_failure(operation: &'static str, err: RepositoryError) -> TokenError {
    warn!(operation, error = %err, "token repository call failed");
    TokenError::RepositoryUnavailable(err.to_string())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use ed25519_dalek::SigningKey;
    use proptest::prelude::*;

    use super::*;

    /// Minimal in-process token store for unit tests.
    #[derive(Default)]
    pub(crate) struct TestTokens {
        tokens: Mutex<HashMap<TokenId, Token>>,
        lookups: AtomicUsize,
        fail: AtomicBool,
        stall: AtomicBool,
    }

    impl TestTokens {
        fn lookups(&self) -> usize {
            self.lookups.load(Ordering::SeqCst)
        }

        async fn gate(&self) -> Result<(), RepositoryError> {
            if self.stall.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(RepositoryError::unavailable("connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl TokenRepository for TestTokens {
        async fn save(&self, token: &Token) -> Result<(), RepositoryError> {
            self.gate().await?;
            self.tokens
                .lock()
                .unwrap()
                .entry(token.id())
                .or_insert_with(|| token.clone());
            Ok(())
        }

        async fn is_revoked(&self, token_id: TokenId) -> Result<bool, RepositoryError> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.gate().await?;
            Ok(self
                .tokens
                .lock()
                .unwrap()
                .get(&token_id)
                .is_none_or(Token::is_revoked))
        }

        async fn revoke(&self, token_id: TokenId) -> Result<(), RepositoryError> {
            self.gate().await?;
            let mut tokens = self.tokens.lock().unwrap();
            if let Some(token) = tokens.remove(&token_id) {
                tokens.insert(token_id, token.into_revoked());
            }
            Ok(())
        }

        async fn revoke_all_for_user(&self, user_id: UserId) -> Result<u64, RepositoryError> {
            self.gate().await?;
            let mut tokens = self.tokens.lock().unwrap();
            let ids: Vec<TokenId> = tokens
                .values()
                .filter(|t| t.user_id() == user_id && !t.is_revoked())
                .map(Token::id)
                .collect();
            for id in &ids {
                if let Some(token) = tokens.remove(id) {
                    tokens.insert(*id, token.into_revoked());
                }
            }
            Ok(ids.len() as u64)
        }
    }

    pub(crate) fn config_with_ttl(ttl: Duration) -> TokenConfig {
        TokenConfig::new(
            KeyPair::from_signing_key(SigningKey::from_bytes(&[7u8; 32])),
            TokenPolicy::new(ttl).unwrap(),
        )
    }

    fn service() -> TokenService<TestTokens> {
        TokenService::new(config_with_ttl(Duration::from_secs(600)), TestTokens::default())
    }

    fn scope() -> RequestScope {
        RequestScope::unbounded()
    }

    #[tokio::test]
    async fn issued_token_verifies_to_its_user() {
        let svc = service();
        let user = UserId::new();

        let token = svc.issue(user, &scope()).await.unwrap();
        assert!(!token.is_revoked());
        assert_eq!(token.expires_at() - token.issued_at(), chrono::Duration::minutes(10));

        let verified = svc.verify(&token.encode(), &scope()).await.unwrap();
        assert_eq!(verified, user);
    }

    #[tokio::test]
    async fn verification_does_exactly_one_lookup() {
        let svc = service();
        let token = svc.issue(UserId::new(), &scope()).await.unwrap();

        svc.verify(&token.encode(), &scope()).await.unwrap();
        assert_eq!(svc.repository().lookups(), 1);
    }

    #[tokio::test]
    async fn zero_ttl_token_is_expired() {
        let svc = TokenService::new(config_with_ttl(Duration::ZERO), TestTokens::default());
        let token = svc.issue(UserId::new(), &scope()).await.unwrap();

        assert_eq!(
            svc.verify(&token.encode(), &scope()).await,
            Err(TokenError::Expired)
        );
        // Expiry is decided without touching storage.
        assert_eq!(svc.repository().lookups(), 0);
    }

    #[tokio::test]
    async fn expired_token_fails_even_with_valid_signature() {
        let svc = service();
        let token = svc.issue(UserId::new(), &scope()).await.unwrap();
        let later = token.expires_at() + chrono::Duration::seconds(1);

        assert!(svc.verify_signature(&token.encode()).is_ok());
        assert_eq!(
            svc.verify_at(&token.encode(), later, &scope()).await,
            Err(TokenError::Expired)
        );
    }

    #[tokio::test]
    async fn token_from_the_future_is_not_yet_valid() {
        let svc = service();
        let now = Utc::now();
        let token = svc
            .issue_at(UserId::new(), now + chrono::Duration::minutes(5), &scope())
            .await
            .unwrap();

        assert_eq!(
            svc.verify_at(&token.encode(), now, &scope()).await,
            Err(TokenError::NotYetValid)
        );
    }

    #[tokio::test]
    async fn revoked_token_is_rejected() {
        let svc = service();
        let token = svc.issue(UserId::new(), &scope()).await.unwrap();

        svc.revoke(token.id(), &scope()).await.unwrap();
        assert_eq!(
            svc.verify(&token.encode(), &scope()).await,
            Err(TokenError::Revoked)
        );

        // Idempotent.
        svc.revoke(token.id(), &scope()).await.unwrap();
        assert_eq!(
            svc.verify(&token.encode(), &scope()).await,
            Err(TokenError::Revoked)
        );
    }

    #[tokio::test]
    async fn token_unknown_to_storage_is_rejected() {
        let svc = service();
        let stray = Token::sign(
            TokenId::new(),
            UserId::new(),
            Utc::now(),
            Utc::now() + chrono::Duration::minutes(1),
            &SigningKey::from_bytes(&[7u8; 32]),
        );

        assert_eq!(
            svc.verify(&stray.encode(), &scope()).await,
            Err(TokenError::Revoked)
        );
    }

    #[tokio::test]
    async fn revoke_all_only_touches_that_user() {
        let svc = service();
        let alice = UserId::new();
        let bob = UserId::new();

        let a1 = svc.issue(alice, &scope()).await.unwrap();
        let a2 = svc.issue(alice, &scope()).await.unwrap();
        let b1 = svc.issue(bob, &scope()).await.unwrap();

        assert_eq!(svc.revoke_all_for_user(alice, &scope()).await.unwrap(), 2);
        assert_eq!(svc.revoke_all_for_user(alice, &scope()).await.unwrap(), 0);

        for t in [&a1, &a2] {
            assert_eq!(
                svc.verify(&t.encode(), &scope()).await,
                Err(TokenError::Revoked)
            );
        }
        assert_eq!(svc.verify(&b1.encode(), &scope()).await, Ok(bob));
    }

    #[tokio::test]
    async fn token_signed_by_another_key_is_invalid() {
        let svc = service();
        let foreign = TokenService::new(
            TokenConfig::new(
                KeyPair::from_signing_key(SigningKey::from_bytes(&[9u8; 32])),
                TokenPolicy::default(),
            ),
            TestTokens::default(),
        );
        let token = foreign.issue(UserId::new(), &scope()).await.unwrap();

        assert_eq!(
            svc.verify(&token.encode(), &scope()).await,
            Err(TokenError::InvalidSignature)
        );
        assert_eq!(svc.repository().lookups(), 0);
    }

    #[tokio::test]
    async fn storage_failure_is_transient() {
        let svc = service();
        let token = svc.issue(UserId::new(), &scope()).await.unwrap();
        svc.repository().fail.store(true, Ordering::SeqCst);

        let err = svc.verify(&token.encode(), &scope()).await.unwrap_err();
        assert!(matches!(err, TokenError::RepositoryUnavailable(_)));
        assert!(err.is_transient());

        assert!(matches!(
            svc.issue(UserId::new(), &scope()).await,
            Err(TokenError::RepositoryUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_lookup_honours_deadline() {
        let svc = service();
        let token = svc.issue(UserId::new(), &scope()).await.unwrap();
        svc.repository().stall.store(true, Ordering::SeqCst);

        let deadline = RequestScope::with_timeout(Duration::from_millis(100));
        let err = svc.verify(&token.encode(), &deadline).await.unwrap_err();
        assert_eq!(err, TokenError::Canceled);
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn canceled_scope_fails_fast() {
        let svc = service();
        let (scope, handle) = RequestScope::unbounded().cancellable();
        handle.cancel();

        assert_eq!(
            svc.issue(UserId::new(), &scope).await,
            Err(TokenError::Canceled)
        );
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
    }

    proptest! {
        #[test]
        fn flipping_any_byte_invalidates(index in 0usize..153, mask in 1u8..=255) {
            let rt = runtime();
            let svc = service();
            let token = rt.block_on(svc.issue(UserId::new(), &scope())).unwrap();
            let encoded = token.encode();
            let index = index % encoded.len();

            let mut bytes = encoded.into_bytes();
            bytes[index] ^= mask;
            let tampered = String::from_utf8_lossy(&bytes).into_owned();

            let result = rt.block_on(svc.verify(&tampered, &scope()));
            prop_assert_eq!(result, Err(TokenError::InvalidSignature));
        }
    }
}
