//! Explicit capability grants on projects.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryPermissionRepository;
pub use postgres::PostgresPermissionRepository;
