//! `comicverse-auth`: token lifecycle and project authorization.
//!
//! This crate is intentionally decoupled from HTTP and storage: it signs and
//! verifies identity tokens, decides access to projects, and talks to storage
//! only through the traits in [`repository`].

pub mod capability;
pub mod config;
pub mod identity;
pub mod permission_service;
pub mod repository;
pub mod token;
pub mod token_service;

pub use capability::{Capability, Permission};
pub use config::{ConfigError, KeyPair, TokenConfig, TokenPolicy};
pub use identity::{
    BearerHeader, CookieHeader, Identity, IdentityContext, IdentityError, RawToken, TokenCarrier,
};
pub use permission_service::{AccessDecision, PermissionError, PermissionService};
pub use repository::{PermissionRepository, ProjectLookup, TokenRepository};
pub use token::{Token, TokenError, validate_window};
pub use token_service::TokenService;
