//! `comicverse-core`: shared building blocks.
//!
//! Identifiers, error kinds shared by every repository, and the request scope
//! used to bound storage calls. No storage or transport concerns live here.

pub mod error;
pub mod id;
pub mod scope;

pub use error::{DomainError, DomainResult, RepositoryError};
pub use id::{ProjectId, TokenId, UserId};
pub use scope::{CancelHandle, Canceled, RequestScope};
