//! Accounts: registration and password login.
//!
//! Domain rules, Argon2id hashing and the storage contract. Tokens are issued
//! by `comicverse-auth` once a user has authenticated here.

pub mod password;
pub mod repository;
pub mod service;
pub mod user;

pub use password::{MAX_PASSWORD_LEN, MIN_PASSWORD_LEN, PasswordError};
pub use repository::UserRepository;
pub use service::{UserError, UserService};
pub use user::{MAX_USERNAME_LEN, MIN_USERNAME_LEN, User, normalize_username};
