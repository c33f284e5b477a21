//! Authenticated principal types shared across the crate.
//!
//! Authentication itself is an external collaborator; the core only consumes
//! the principal it yields: an identifier, a role, and an IANA timezone used
//! by the time-windowed access rules.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Unique identifier for an authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(Uuid);

impl PrincipalId {
    /// Creates a new random principal identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a principal identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the wrapped UUID.
    #[must_use]
    pub const fn into_inner(self) -> Uuid {
        self.0
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role assigned to a principal by the authentication collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Unrestricted write access within rate limits.
    Manager,
    /// Write access limited to own tasks and local business hours.
    Developer,
    /// Read-only access.
    Auditor,
}

impl Role {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::Developer => "developer",
            Self::Auditor => "auditor",
        }
    }
}

impl TryFrom<&str> for Role {
    type Error = ParseRoleError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "manager" => Ok(Self::Manager),
            "developer" => Ok(Self::Developer),
            "auditor" => Ok(Self::Auditor),
            _ => Err(ParseRoleError(value.to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned while parsing roles from persistence or tokens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown role: {0}")]
pub struct ParseRoleError(pub String);

/// Authenticated caller as resolved by the external authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    id: PrincipalId,
    role: Role,
    timezone: String,
}

impl Principal {
    /// Creates a principal from resolved authentication data.
    ///
    /// The timezone is an IANA zone name (for example `Asia/Kolkata`). It is
    /// not validated here; the access evaluator treats an unparseable zone as
    /// a denial.
    #[must_use]
    pub fn new(id: PrincipalId, role: Role, timezone: impl Into<String>) -> Self {
        Self {
            id,
            role,
            timezone: timezone.into(),
        }
    }

    /// Returns the principal identifier.
    #[must_use]
    pub const fn id(&self) -> PrincipalId {
        self.id
    }

    /// Returns the principal role.
    #[must_use]
    pub const fn role(&self) -> Role {
        self.role
    }

    /// Returns the IANA timezone name.
    #[must_use]
    pub fn timezone(&self) -> &str {
        &self.timezone
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("manager", Role::Manager)]
    #[case("developer", Role::Developer)]
    #[case("auditor", Role::Auditor)]
    #[case(" Manager ", Role::Manager)]
    fn role_parses_known_values(#[case] input: &str, #[case] expected: Role) {
        assert_eq!(Role::try_from(input), Ok(expected));
    }

    #[rstest]
    fn role_rejects_unknown_value() {
        assert_eq!(
            Role::try_from("intern"),
            Err(ParseRoleError("intern".to_owned()))
        );
    }

    #[rstest]
    fn role_round_trips_through_as_str() {
        for role in [Role::Manager, Role::Developer, Role::Auditor] {
            assert_eq!(Role::try_from(role.as_str()), Ok(role));
        }
    }
}
