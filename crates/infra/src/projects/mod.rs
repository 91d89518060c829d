//! Project storage. Both implementations also answer ownership lookups for
//! the permission service.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryProjectRepository;
pub use postgres::PostgresProjectRepository;
