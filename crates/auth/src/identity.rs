//! Resolving the caller's identity from a request-carried token.
//!
//! Every token failure (missing, malformed, tampered, expired, revoked)
//! collapses into [`IdentityError::Unauthorized`] so a boundary cannot be used
//! as an oracle for which check failed. Only storage trouble stays distinct,
//! as [`IdentityError::Unavailable`], because it is retryable.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

use comicverse_core::{RequestScope, TokenId, UserId};

use crate::{TokenRepository, TokenService};

/// Something a request carries that may hold an encoded token.
pub trait TokenCarrier {
    fn encoded_token(&self) -> Option<&str>;
}

/// A bare encoded token.
#[derive(Debug, Copy, Clone)]
pub struct RawToken<'a>(pub &'a str);

impl TokenCarrier for RawToken<'_> {
    fn encoded_token(&self) -> Option<&str> {
        non_empty(self.0)
    }
}

/// An `Authorization` header value: `Bearer <token>`.
#[derive(Debug, Copy, Clone)]
pub struct BearerHeader<'a>(pub &'a str);

impl TokenCarrier for BearerHeader<'_> {
    fn encoded_token(&self) -> Option<&str> {
        non_empty(self.0.strip_prefix("Bearer ")?)
    }
}

/// A `Cookie` header value; the token is read from cookie `name`.
#[derive(Debug, Copy, Clone)]
pub struct CookieHeader<'a> {
    header: &'a str,
    name: &'a str,
}

impl<'a> CookieHeader<'a> {
    pub fn new(header: &'a str, name: &'a str) -> Self {
        Self { header, name }
    }
}

impl TokenCarrier for CookieHeader<'_> {
    fn encoded_token(&self) -> Option<&str> {
        self.header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .and_then(|(_, value)| non_empty(value))
    }
}

impl<C: TokenCarrier> TokenCarrier for Option<C> {
    fn encoded_token(&self) -> Option<&str> {
        self.as_ref()?.encoded_token()
    }
}

/// First carrier that yields a token wins.
impl<A: TokenCarrier, B: TokenCarrier> TokenCarrier for (A, B) {
    fn encoded_token(&self) -> Option<&str> {
        self.0.encoded_token().or_else(|| self.1.encoded_token())
    }
}

fn non_empty(value: &str) -> Option<&str> {
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}

/// The verified caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub token_id: TokenId,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Error, Copy, Clone, PartialEq, Eq)]
pub enum IdentityError {
    /// No usable token. Deliberately says nothing about why.
    #[error("unauthorized")]
    Unauthorized,

    /// Verification could not complete (storage down or request canceled).
    #[error("identity temporarily unavailable")]
    Unavailable,
}

/// Turns a request's carried token into an [`Identity`].
///
/// Performs no verification of its own; everything is delegated to
/// [`TokenService`].
pub struct IdentityContext<R> {
    tokens: Arc<TokenService<R>>,
}

impl<R> Clone for IdentityContext<R> {
    fn clone(&self) -> Self {
        Self {
            tokens: Arc::clone(&self.tokens),
        }
    }
}

impl<R> IdentityContext<R>
where
    R: TokenRepository,
{
    pub fn new(tokens: Arc<TokenService<R>>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenService<R> {
        &self.tokens
    }

    /// The caller's identity, or `None` for any failure at all.
    pub async fn resolve<C>(&self, carrier: &C, scope: &RequestScope) -> Option<Identity>
    where
        C: TokenCarrier + Sync + ?Sized,
    {
        self.authenticate(carrier, scope).await.ok()
    }

    pub async fn authenticate<C>(
        &self,
        carrier: &C,
        scope: &RequestScope,
    ) -> Result<Identity, IdentityError>
    where
        C: TokenCarrier + Sync + ?Sized,
    {
        self.authenticate_at(carrier, Utc::now(), scope).await
    }

    pub async fn authenticate_at<C>(
        &self,
        carrier: &C,
        now: DateTime<Utc>,
        scope: &RequestScope,
    ) -> Result<Identity, IdentityError>
    where
        C: TokenCarrier + Sync + ?Sized,
    {
        let Some(encoded) = carrier.encoded_token() else {
            debug!("no token carried");
            return Err(IdentityError::Unauthorized);
        };

        match self.tokens.authenticate_at(encoded, now, scope).await {
            Ok(token) => Ok(Identity {
                user_id: token.user_id(),
                token_id: token.id(),
                expires_at: token.expires_at(),
            }),
            Err(e) if e.is_transient() => Err(IdentityError::Unavailable),
            Err(_) => Err(IdentityError::Unauthorized),
        }
    }
}
