use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use comicverse_core::{DomainError, ProjectId, UserId};

/// A named action that may be permitted on a project (e.g. "read", "write").
///
/// Capabilities are opaque strings at this layer. Project owners hold every
/// capability implicitly; everyone else needs an explicit [`Permission`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Capability(Cow<'static, str>);

impl Capability {
    pub const READ: Capability = Capability(Cow::Borrowed("read"));
    pub const WRITE: Capability = Capability(Cow::Borrowed("write"));
    /// Allows granting and revoking capabilities for other users.
    pub const SHARE: Capability = Capability(Cow::Borrowed("share"));

    pub const MAX_LEN: usize = 64;

    /// Parse a capability name from untrusted input.
    ///
    /// Names are 1..=64 bytes of lowercase ASCII letters, digits, `.`, `_` or `-`.
    pub fn parse(name: impl Into<Cow<'static, str>>) -> Result<Self, DomainError> {
        let name = name.into();
        if name.is_empty() {
            return Err(DomainError::validation("capability must not be empty"));
        }
        if name.len() > Self::MAX_LEN {
            return Err(DomainError::validation(format!(
                "capability must be at most {} bytes",
                Self::MAX_LEN
            )));
        }
        let valid = name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'.' | b'_' | b'-'));
        if !valid {
            return Err(DomainError::validation(format!(
                "capability '{name}' contains invalid characters"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::str::FromStr for Capability {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s.to_string())
    }
}

impl TryFrom<String> for Capability {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Capability> for String {
    fn from(value: Capability) -> Self {
        value.0.into_owned()
    }
}

/// An explicit grant of one capability on one project to one user.
///
/// At most one grant exists per `(project_id, user_id, capability)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Permission {
    pub project_id: ProjectId,
    pub user_id: UserId,
    pub capability: Capability,
}

impl Permission {
    pub fn new(project_id: ProjectId, user_id: UserId, capability: Capability) -> Self {
        Self {
            project_id,
            user_id,
            capability,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn well_known_capabilities_are_valid() {
        for cap in [Capability::READ, Capability::WRITE, Capability::SHARE] {
            assert_eq!(Capability::parse(cap.as_str().to_string()).unwrap(), cap);
        }
    }

    #[test]
    fn parse_accepts_dotted_names() {
        let cap: Capability = "pages.publish".parse().unwrap();
        assert_eq!(cap.to_string(), "pages.publish");
    }

    #[test]
    fn parse_rejects_empty_uppercase_and_long_names() {
        assert!(Capability::parse("").is_err());
        assert!(Capability::parse("Write").is_err());
        assert!(Capability::parse("read write").is_err());
        assert!(Capability::parse("x".repeat(Capability::MAX_LEN + 1)).is_err());
        assert!(Capability::parse("x".repeat(Capability::MAX_LEN)).is_ok());
    }

    #[test]
    fn deserialization_applies_the_same_rules() {
        let cap: Capability = serde_json::from_str("\"pages.publish\"").unwrap();
        assert_eq!(cap.as_str(), "pages.publish");
        assert_eq!(serde_json::to_string(&cap).unwrap(), "\"pages.publish\"");

        assert!(serde_json::from_str::<Capability>("\"Not Valid; DROP\"").is_err());
        assert!(serde_json::from_str::<Capability>("\"\"").is_err());

        let grant = serde_json::json!({
            "project_id": ProjectId::new(),
            "user_id": UserId::new(),
            "capability": "READ",
        });
        assert!(serde_json::from_value::<Permission>(grant).is_err());
    }
}
