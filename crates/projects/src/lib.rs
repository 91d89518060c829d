//! Projects: the comic workspaces users own and share.
//!
//! Domain rules and the storage contract only. Access control lives in
//! `comicverse-auth`; storage adapters live in `comicverse-infra`.

pub mod project;
pub mod repository;
pub mod service;

pub use project::{MAX_TITLE_LEN, Project, normalize_title};
pub use repository::ProjectRepository;
pub use service::{ProjectError, ProjectService};
