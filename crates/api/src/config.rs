//! Process configuration, read once at startup from the environment.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use comicverse_auth::{KeyPair, TokenConfig, TokenPolicy};

pub const SIGNING_KEY_VAR: &str = "COMICVERSE_SIGNING_KEY";
pub const VERIFYING_KEY_VAR: &str = "COMICVERSE_VERIFYING_KEY";
pub const TOKEN_TTL_VAR: &str = "COMICVERSE_TOKEN_TTL_SECS";
pub const CLOCK_SKEW_VAR: &str = "COMICVERSE_CLOCK_SKEW_SECS";
pub const REQUEST_TIMEOUT_VAR: &str = "COMICVERSE_REQUEST_TIMEOUT_MS";
pub const BIND_VAR: &str = "COMICVERSE_BIND";
pub const DEV_MODE_VAR: &str = "COMICVERSE_DEV_MODE";
pub const DATABASE_URL_VAR: &str = "DATABASE_URL";

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("COMICVERSE_SIGNING_KEY and COMICVERSE_VERIFYING_KEY must be set outside development mode")]
    MissingKeys,

    #[error("{0} is set but its counterpart is not")]
    PartialKeys(&'static str),

    #[error("{0} is not valid hex")]
    InvalidHex(&'static str),

    #[error("{var} must be a non-negative integer, got {value:?}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("COMICVERSE_BIND is not a socket address: {0:?}")]
    InvalidBind(String),

    #[error(transparent)]
    Token(#[from] comicverse_auth::ConfigError),
}

/// Everything `main` needs to build the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub token: TokenConfig,
    /// Deadline applied to the storage calls of each request.
    pub request_timeout: Duration,
    pub bind: SocketAddr,
    /// Enables the token-minting dev route and human-readable logs.
    pub dev_mode: bool,
    /// Postgres when set; in-memory storage otherwise.
    pub database_url: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Only the dev-mode flag; needed before logging is initialized.
    pub fn dev_mode_from_env() -> bool {
        dev_mode(std::env::var(DEV_MODE_VAR).ok().as_deref())
    }

    /// Parse configuration through `lookup`, which returns a variable's value
    /// if it is set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let dev_mode = dev_mode(lookup(DEV_MODE_VAR).as_deref());

        let keys = match (
            non_empty(lookup(SIGNING_KEY_VAR)),
            non_empty(lookup(VERIFYING_KEY_VAR)),
        ) {
            (Some(private), Some(public)) => {
                let private = hex::decode(private.trim())
                    .map_err(|_| ConfigError::InvalidHex(SIGNING_KEY_VAR))?;
                let public = hex::decode(public.trim())
                    .map_err(|_| ConfigError::InvalidHex(VERIFYING_KEY_VAR))?;
                KeyPair::from_bytes(&private, &public)?
            }
            (Some(_), None) => return Err(ConfigError::PartialKeys(SIGNING_KEY_VAR)),
            (None, Some(_)) => return Err(ConfigError::PartialKeys(VERIFYING_KEY_VAR)),
            (None, None) if dev_mode => {
                tracing::warn!("no signing keys configured; using an ephemeral dev key pair");
                KeyPair::generate()
            }
            (None, None) => return Err(ConfigError::MissingKeys),
        };

        let mut policy = TokenPolicy::default();
        if let Some(secs) = number(&lookup, TOKEN_TTL_VAR)? {
            policy = policy.with_ttl(Duration::from_secs(secs))?;
        }
        if let Some(secs) = number(&lookup, CLOCK_SKEW_VAR)? {
            policy = policy.with_clock_skew(Duration::from_secs(secs))?;
        }

        let request_timeout = number(&lookup, REQUEST_TIMEOUT_VAR)?
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);

        let bind = non_empty(lookup(BIND_VAR)).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind
            .parse()
            .map_err(|_| ConfigError::InvalidBind(bind.clone()))?;

        Ok(Self {
            token: TokenConfig::new(keys, policy),
            request_timeout,
            bind,
            dev_mode,
            database_url: non_empty(lookup(DATABASE_URL_VAR)),
        })
    }

    /// In-memory development setup with an ephemeral key pair.
    pub fn development() -> Self {
        Self {
            token: TokenConfig::new(KeyPair::generate(), TokenPolicy::default()),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            bind: SocketAddr::from(([127, 0, 0, 1], 0)),
            dev_mode: true,
            database_url: None,
        }
    }
}

fn dev_mode(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes")
    )
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn number<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(lookup(var))
        .map(|value| {
            value
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidNumber { var, value })
        })
        .transpose()
}
