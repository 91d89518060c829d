//! Infrastructure layer: storage adapters for the auth and project services.
//!
//! Each repository contract has an in-memory implementation (tests, dev mode)
//! and a Postgres implementation. Both run the shared suites in
//! `contract_tests.rs`; the Postgres runs need `DATABASE_URL`.

pub mod db;
pub mod permissions;
pub mod projects;
pub mod tokens;
pub mod users;

pub use permissions::{InMemoryPermissionRepository, PostgresPermissionRepository};
pub use projects::{InMemoryProjectRepository, PostgresProjectRepository};
pub use tokens::{InMemoryTokenRepository, PostgresTokenRepository};
pub use users::{InMemoryUserRepository, PostgresUserRepository};

#[cfg(test)]
mod contract_tests;
