//! Shared vocabulary for membership sets and error categories.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named, server-held set of opportunity ids owned by one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MembershipSet {
    /// Opportunities the identity marked as favorite.
    Favorites,
    /// Opportunities the identity reserved a spot at.
    Rsvp,
}

impl MembershipSet {
    /// Both sets, in a fixed order.
    pub const ALL: [MembershipSet; 2] = [Self::Favorites, Self::Rsvp];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Favorites => "favorites",
            Self::Rsvp => "rsvp",
        }
    }
}

impl fmt::Display for MembershipSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Independent slots for surfaced errors. An error in one category never
/// clears or blocks another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Favorites, opportunity editing, listener failures.
    General,
    /// RSVP add/cancel.
    Rsvp,
    /// Attendance recording.
    Attendance,
    /// Manager-initiated attendee removal.
    Removal,
}

impl ErrorCategory {
    /// Every category.
    pub const ALL: [ErrorCategory; 4] = [
        Self::General,
        Self::Rsvp,
        Self::Attendance,
        Self::Removal,
    ];

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Rsvp => "rsvp",
            Self::Attendance => "attendance",
            Self::Removal => "removal",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
