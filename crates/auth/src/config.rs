//! Signing keys and token policy.
//!
//! Configuration is built once at startup, validated, and passed by value into
//! [`crate::TokenService::new`]. There are no process-wide defaults.

use std::time::Duration;

use ed25519_dalek::{KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH, SigningKey, VerifyingKey};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} key must not be empty")]
    MissingKey(&'static str),

    #[error("{which} key has invalid length {actual} (expected {expected})")]
    InvalidKeyLength {
        which: &'static str,
        expected: &'static str,
        actual: usize,
    },

    #[error("invalid {0} key")]
    InvalidKey(&'static str),

    #[error("public key does not belong to the private key")]
    KeyMismatch,

    #[error("{0} is out of range")]
    DurationOutOfRange(&'static str),
}

/// The service's single static Ed25519 key pair.
#[derive(Clone)]
pub struct KeyPair {
    signing: SigningKey,
    verifying: VerifyingKey,
}

impl KeyPair {
    /// Build a key pair from raw bytes.
    ///
    /// `private` is either a 32-byte seed or a 64-byte `seed || public` key
    /// pair. `public` must be the 32-byte key derived from `private`.
    pub fn from_bytes(private: &[u8], public: &[u8]) -> Result<Self, ConfigError> {
        if private.is_empty() {
            return Err(ConfigError::MissingKey("private"));
        }
        if public.is_empty() {
            return Err(ConfigError::MissingKey("public"));
        }

        let signing = match private.len() {
            SECRET_KEY_LENGTH => {
                let mut seed = [0u8; SECRET_KEY_LENGTH];
                seed.copy_from_slice(private);
                SigningKey::from_bytes(&seed)
            }
            KEYPAIR_LENGTH => {
                let mut pair = [0u8; KEYPAIR_LENGTH];
                pair.copy_from_slice(private);
                SigningKey::from_keypair_bytes(&pair).map_err(|_| ConfigError::KeyMismatch)?
            }
            actual => {
                return Err(ConfigError::InvalidKeyLength {
                    which: "private",
                    expected: "32 or 64",
                    actual,
                });
            }
        };

        let public: [u8; PUBLIC_KEY_LENGTH] =
            public
                .try_into()
                .map_err(|_| ConfigError::InvalidKeyLength {
                    which: "public",
                    expected: "32",
                    actual: public.len(),
                })?;
        let verifying =
            VerifyingKey::from_bytes(&public).map_err(|_| ConfigError::InvalidKey("public"))?;

        if signing.verifying_key() != verifying {
            return Err(ConfigError::KeyMismatch);
        }

        Ok(Self { signing, verifying })
    }

    pub fn from_signing_key(signing: SigningKey) -> Self {
        let verifying = signing.verifying_key();
        Self { signing, verifying }
    }

    /// Fresh key pair from the OS RNG. Only suitable for development: tokens
    /// do not survive a restart.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::rngs::OsRng))
    }

    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.signing
    }
}

impl core::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyPair")
            .field("verifying", &self.verifying)
            .field("signing", &"<redacted>")
            .finish()
    }
}

/// Token lifetime policy.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TokenPolicy {
    ttl: chrono::Duration,
    clock_skew: chrono::Duration,
}

impl TokenPolicy {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);
    pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(30);
    /// Upper bound on token lifetime.
    pub const MAX_TTL: Duration = Duration::from_secs(366 * 24 * 60 * 60);

    /// A zero TTL is accepted; such tokens are expired on issue.
    pub fn new(ttl: Duration) -> Result<Self, ConfigError> {
        Self::default().with_ttl(ttl)
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Result<Self, ConfigError> {
        if ttl > Self::MAX_TTL {
            return Err(ConfigError::DurationOutOfRange("token ttl"));
        }
        self.ttl = chrono::Duration::from_std(ttl)
            .map_err(|_| ConfigError::DurationOutOfRange("token ttl"))?;
        Ok(self)
    }

    /// How far in the future `issued_at` may lie before a token is rejected
    /// as not yet valid.
    pub fn with_clock_skew(mut self, skew: Duration) -> Result<Self, ConfigError> {
        if skew > Self::MAX_TTL {
            return Err(ConfigError::DurationOutOfRange("clock skew"));
        }
        self.clock_skew = chrono::Duration::from_std(skew)
            .map_err(|_| ConfigError::DurationOutOfRange("clock skew"))?;
        Ok(self)
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    pub fn clock_skew(&self) -> chrono::Duration {
        self.clock_skew
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            ttl: chrono::Duration::seconds(Self::DEFAULT_TTL.as_secs() as i64),
            clock_skew: chrono::Duration::seconds(Self::DEFAULT_CLOCK_SKEW.as_secs() as i64),
        }
    }
}

/// Everything [`crate::TokenService`] needs besides its repository.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    pub keys: KeyPair,
    pub policy: TokenPolicy,
}

impl TokenConfig {
    pub fn new(keys: KeyPair, policy: TokenPolicy) -> Self {
        Self { keys, policy }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(b: u8) -> [u8; 32] {
        [b; 32]
    }

    #[test]
    fn accepts_seed_and_matching_public_key() {
        let signing = SigningKey::from_bytes(&seed(7));
        let public = signing.verifying_key().to_bytes();

        let keys = KeyPair::from_bytes(&seed(7), &public).unwrap();
        assert_eq!(keys.verifying_key().to_bytes(), public);
    }

    #[test]
    fn accepts_64_byte_keypair_encoding() {
        let signing = SigningKey::from_bytes(&seed(3));
        let pair = signing.to_keypair_bytes();
        let public = signing.verifying_key().to_bytes();

        assert!(KeyPair::from_bytes(&pair, &public).is_ok());
    }

    #[test]
    fn rejects_empty_keys() {
        let public = SigningKey::from_bytes(&seed(1)).verifying_key().to_bytes();
        assert_eq!(
            KeyPair::from_bytes(&[], &public).unwrap_err(),
            ConfigError::MissingKey("private")
        );
        assert_eq!(
            KeyPair::from_bytes(&seed(1), &[]).unwrap_err(),
            ConfigError::MissingKey("public")
        );
    }

    #[test]
    fn rejects_wrong_lengths() {
        let public = SigningKey::from_bytes(&seed(1)).verifying_key().to_bytes();
        assert!(matches!(
            KeyPair::from_bytes(&[1u8; 31], &public),
            Err(ConfigError::InvalidKeyLength { which: "private", .. })
        ));
        assert!(matches!(
            KeyPair::from_bytes(&seed(1), &public[..16]),
            Err(ConfigError::InvalidKeyLength { which: "public", .. })
        ));
    }

    #[test]
    fn rejects_mismatched_public_key() {
        let other = SigningKey::from_bytes(&seed(2)).verifying_key().to_bytes();
        assert_eq!(
            KeyPair::from_bytes(&seed(1), &other).unwrap_err(),
            ConfigError::KeyMismatch
        );
    }

    #[test]
    fn debug_output_redacts_private_key() {
        let keys = KeyPair::from_signing_key(SigningKey::from_bytes(&seed(9)));
        let rendered = format!("{keys:?}");
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn policy_bounds() {
        assert_eq!(TokenPolicy::new(Duration::ZERO).unwrap().ttl(), chrono::Duration::zero());
        assert!(TokenPolicy::new(TokenPolicy::MAX_TTL + Duration::from_secs(1)).is_err());

        let policy = TokenPolicy::default()
            .with_clock_skew(Duration::from_secs(5))
            .unwrap();
        assert_eq!(policy.clock_skew(), chrono::Duration::seconds(5));
        assert_eq!(policy.ttl(), chrono::Duration::hours(24));
    }
}
