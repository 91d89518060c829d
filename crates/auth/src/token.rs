//! Signed identity tokens.
//!
//! Wire form: `base64url(payload) "." base64url(signature)`, no padding. The
//! payload is the fixed 49-byte canonical encoding of the claims:
//!
//! | bytes  | field                               |
//! |--------|-------------------------------------|
//! | 0      | format version (`1`)                |
//! | 1..17  | token id (UUID)                     |
//! | 17..33 | user id (UUID)                      |
//! | 33..41 | issued-at, Unix millis, big-endian  |
//! | 41..49 | expires-at, Unix millis, big-endian |
//!
//! The Ed25519 signature covers exactly these bytes.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use ed25519_dalek::{SIGNATURE_LENGTH, Signature, Signer, SigningKey, VerifyingKey};
use thiserror::Error;

use comicverse_core::{Canceled, TokenId, UserId};

pub const FORMAT_VERSION: u8 = 1;
pub const PAYLOAD_LEN: usize = 49;
/// Anything longer cannot be a token; rejected before decoding.
const MAX_ENCODED_LEN: usize = 256;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    /// Signature did not verify, or the token was malformed.
    #[error("invalid token signature")]
    InvalidSignature,

    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("token has been revoked")]
    Revoked,

    #[error("token repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("request canceled")]
    Canceled,
}

impl TokenError {
    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RepositoryUnavailable(_) | Self::Canceled)
    }
}

impl From<Canceled> for TokenError {
    fn from(_: Canceled) -> Self {
        Self::Canceled
    }
}

/// Why a presented string was rejected before any policy check. Kept
/// internal: callers only ever see [`TokenError::InvalidSignature`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Rejected {
    Signature,
    TooLong,
    MissingSeparator,
    Encoding,
    PayloadLength,
    SignatureLength,
    Version,
    Timestamp,
}

/// An issued token.
///
/// Immutable after issue except for the monotonic `revoked` flag, which only
/// storage tracks; tokens decoded from the wire always read `revoked == false`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    id: TokenId,
    user_id: UserId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    signature: Signature,
    revoked: bool,
}

impl Token {
    pub(crate) fn sign(
        id: TokenId,
        user_id: UserId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        key: &SigningKey,
    ) -> Self {
        let payload = canonical_payload(id, user_id, issued_at, expires_at);
        let signature = key.sign(&payload);
        Self {
            id,
            user_id,
            issued_at,
            expires_at,
            signature,
            revoked: false,
        }
    }

    /// Rehydrate a stored token. Performs no verification.
    pub fn from_parts(
        id: TokenId,
        user_id: UserId,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        signature: [u8; SIGNATURE_LENGTH],
        revoked: bool,
    ) -> Self {
        Self {
            id,
            user_id,
            issued_at,
            expires_at,
            signature: Signature::from_bytes(&signature),
            revoked,
        }
    }

    pub fn id(&self) -> TokenId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn signature(&self) -> [u8; SIGNATURE_LENGTH] {
        self.signature.to_bytes()
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Copy of this token with the revocation flag set.
    pub fn into_revoked(self) -> Self {
        Self {
            revoked: true,
            ..self
        }
    }

    pub fn canonical_payload(&self) -> [u8; PAYLOAD_LEN] {
        canonical_payload(self.id, self.user_id, self.issued_at, self.expires_at)
    }

    /// URL-safe transport form, usable as a header or cookie value.
    pub fn encode(&self) -> String {
        let mut out = URL_SAFE_NO_PAD.encode(self.canonical_payload());
        out.push('.');
        URL_SAFE_NO_PAD.encode_string(self.signature.to_bytes(), &mut out);
        out
    }

    /// Decode the transport form and check the signature against `key`.
    pub(crate) fn decode_verified(encoded: &str, key: &VerifyingKey) -> Result<Self, Rejected> {
        let token = Self::decode(encoded)?;
        key.verify_strict(&token.canonical_payload(), &token.signature)
            .map_err(|_| Rejected::Signature)?;
        Ok(token)
    }

    fn decode(encoded: &str) -> Result<Self, Rejected> {
        if encoded.len() > MAX_ENCODED_LEN {
            return Err(Rejected::TooLong);
        }
        let (payload, signature) = encoded.split_once('.').ok_or(Rejected::MissingSeparator)?;

        let payload = URL_SAFE_NO_PAD
            .decode(payload)
            .map_err(|_| Rejected::Encoding)?;
        let payload: [u8; PAYLOAD_LEN] = payload
            .as_slice()
            .try_into()
            .map_err(|_| Rejected::PayloadLength)?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .map_err(|_| Rejected::Encoding)?;
        let signature: [u8; SIGNATURE_LENGTH] = signature
            .as_slice()
            .try_into()
            .map_err(|_| Rejected::SignatureLength)?;

        if payload[0] != FORMAT_VERSION {
            return Err(Rejected::Version);
        }

        let id = TokenId::from_bytes(array_at(&payload, 1));
        let user_id = UserId::from_bytes(array_at(&payload, 17));
        let issued_at = DateTime::from_timestamp_millis(i64::from_be_bytes(array_at(&payload, 33)))
            .ok_or(Rejected::Timestamp)?;
        let expires_at = DateTime::from_timestamp_millis(i64::from_be_bytes(array_at(&payload, 41)))
            .ok_or(Rejected::Timestamp)?;

        Ok(Self::from_parts(id, user_id, issued_at, expires_at, signature, false))
    }
}

fn canonical_payload(
    id: TokenId,
    user_id: UserId,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
) -> [u8; PAYLOAD_LEN] {
    let mut out = [0u8; PAYLOAD_LEN];
    out[0] = FORMAT_VERSION;
    out[1..17].copy_from_slice(id.as_bytes());
    out[17..33].copy_from_slice(user_id.as_bytes());
    out[33..41].copy_from_slice(&issued_at.timestamp_millis().to_be_bytes());
    out[41..49].copy_from_slice(&expires_at.timestamp_millis().to_be_bytes());
    out
}

fn array_at<const N: usize>(bytes: &[u8; PAYLOAD_LEN], start: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[start..start + N]);
    out
}

/// Check the token's validity window at `now`.
///
/// Valid iff `issued_at <= now + clock_skew` and `now < expires_at`.
/// Signature and revocation are checked elsewhere.
pub fn validate_window(
    token: &Token,
    now: DateTime<Utc>,
    clock_skew: chrono::Duration,
) -> Result<(), TokenError> {
    if now >= token.expires_at {
        return Err(TokenError::Expired);
    }
    if now + clock_skew < token.issued_at {
        return Err(TokenError::NotYetValid);
    }
    Ok(())
}
