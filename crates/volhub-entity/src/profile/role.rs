//! User role enumeration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Roles an identity can hold.
///
/// Roles are ordered by privilege level: Manager > User > Anonymous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Creates opportunities, records attendance, removes attendees.
    Manager,
    /// Signed-in member: favorites and RSVPs.
    User,
    /// Guest identity: browse and favorite only.
    Anonymous,
}

impl UserRole {
    /// Return the privilege level (higher = more privileged).
    pub fn privilege_level(&self) -> u8 {
        match self {
            Self::Manager => 3,
            Self::User => 2,
            Self::Anonymous => 1,
        }
    }

    /// Check if this role has at least the given role's privileges.
    pub fn has_at_least(&self, other: &UserRole) -> bool {
        self.privilege_level() >= other.privilege_level()
    }

    /// Check if this role is a manager.
    pub fn is_manager(&self) -> bool {
        matches!(self, Self::Manager)
    }

    /// Check if this role is anonymous.
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Self::Anonymous)
    }

    /// Parse a stored role, falling back to the least-privileged role.
    pub fn from_str_or_least(s: &str) -> Self {
        s.parse().unwrap_or(Self::Anonymous)
    }

    /// Return the role as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::User => "user",
            Self::Anonymous => "anonymous",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = volhub_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "manager" => Ok(Self::Manager),
            "user" => Ok(Self::User),
            "anonymous" => Ok(Self::Anonymous),
            _ => Err(volhub_core::AppError::validation(format!(
                "Invalid user role: '{s}'. Expected one of: manager, user, anonymous"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_privilege_ordering() {
        assert!(UserRole::Manager.has_at_least(&UserRole::User));
        assert!(UserRole::User.has_at_least(&UserRole::Anonymous));
        assert!(!UserRole::Anonymous.has_at_least(&UserRole::User));
    }

    #[test]
    fn test_parse_and_fallback() {
        assert_eq!("Manager".parse::<UserRole>().expect("parse"), UserRole::Manager);
        assert!("admin".parse::<UserRole>().is_err());
        assert_eq!(UserRole::from_str_or_least("admin"), UserRole::Anonymous);
    }
}
