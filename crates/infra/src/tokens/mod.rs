//! Token storage: issued tokens and their revocation flags.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryTokenRepository;
pub use postgres::PostgresTokenRepository;
