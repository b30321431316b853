//! Mutation kinds and requests.

use std::fmt;

use serde::{Deserialize, Serialize};

use volhub_core::types::{ErrorCategory, Write};

use super::precondition::Precondition;

/// The operation a mutation performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    RsvpAdd,
    RsvpRemove,
    FavoriteAdd,
    FavoriteRemove,
    RecordAttendance,
    ManagerRemoval,
    CreateOpportunity,
    UpdateOpportunity,
    DeleteOpportunity,
}

impl MutationKind {
    /// The error category failures of this kind are surfaced under.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::RsvpAdd | Self::RsvpRemove => ErrorCategory::Rsvp,
            Self::RecordAttendance => ErrorCategory::Attendance,
            Self::ManagerRemoval => ErrorCategory::Removal,
            Self::FavoriteAdd
            | Self::FavoriteRemove
            | Self::CreateOpportunity
            | Self::UpdateOpportunity
            | Self::DeleteOpportunity => ErrorCategory::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RsvpAdd => "rsvp_add",
            Self::RsvpRemove => "rsvp_remove",
            Self::FavoriteAdd => "favorite_add",
            Self::FavoriteRemove => "favorite_remove",
            Self::RecordAttendance => "record_attendance",
            Self::ManagerRemoval => "manager_removal",
            Self::CreateOpportunity => "create_opportunity",
            Self::UpdateOpportunity => "update_opportunity",
            Self::DeleteOpportunity => "delete_opportunity",
        }
    }
}

impl fmt::Display for MutationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fully described mutation, ready to be checked and committed.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationRequest {
    /// What the mutation does.
    pub kind: MutationKind,
    /// Fast-fail checks, evaluated in order before any remote call.
    pub preconditions: Vec<Precondition>,
    /// Writes committed as one atomic unit.
    pub writes: Vec<Write>,
}

impl MutationRequest {
    /// An empty request of `kind`.
    pub fn new(kind: MutationKind) -> Self {
        Self {
            kind,
            preconditions: Vec::new(),
            writes: Vec::new(),
        }
    }

    /// Add a precondition.
    pub fn require(mut self, precondition: Precondition) -> Self {
        self.preconditions.push(precondition);
        self
    }

    /// Append a write.
    pub fn write(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    /// The error category of this request.
    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }
}
