use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use comicverse_core::{DomainError, DomainResult, ProjectId, UserId};

/// Longest accepted title, in characters.
pub const MAX_TITLE_LEN: usize = 256;

/// A comic project. The owner holds every capability on it implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Project {
    /// A new project owned by `owner_id`, with a fresh id.
    ///
    /// `created_at` is truncated to microseconds, the precision storage keeps.
    pub fn new(title: &str, owner_id: UserId, created_at: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: ProjectId::new(),
            title: normalize_title(title)?,
            owner_id,
            created_at: created_at.trunc_subsecs(6),
        })
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }
}

/// Trim surrounding whitespace and enforce the title rules.
pub fn normalize_title(title: &str) -> DomainResult<String> {
    let title = title.trim();
    if title.is_empty() {
        return Err(DomainError::validation("title must not be empty"));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(DomainError::validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}
