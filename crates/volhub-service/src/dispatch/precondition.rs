//! Client-side preconditions checked before any remote call.

use chrono::{DateTime, Utc};

use volhub_core::error::AppError;
use volhub_core::result::AppResult;
use volhub_core::types::IdentityId;
use volhub_entity::{OpportunityDraft, UserRole};

/// One fast-fail check. Each variant carries the facts it tests, captured
/// when the request was built, so evaluation only needs the current time.
#[derive(Debug, Clone, PartialEq)]
pub enum Precondition {
    /// The session is still signed in.
    ActiveIdentity { active: bool },
    /// The caller is not anonymous.
    NonAnonymous { anonymous: bool },
    /// The caller holds the manager role.
    Manager { role: UserRole },
    /// The caller created the opportunity.
    Creator {
        caller: IdentityId,
        creator: IdentityId,
    },
    /// The opportunity has not ended.
    NotEnded { end: DateTime<Utc> },
    /// The opportunity is not currently taking place.
    NotOngoing {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    /// The opportunity has a free spot.
    HasCapacity {
        capacity: Option<u32>,
        attendees: usize,
    },
    /// The identity is in the opportunity's attendee set.
    Attending {
        attendee: IdentityId,
        attending: bool,
    },
    /// A new capacity does not drop below the current attendee count.
    CapacityCoversAttendees {
        capacity: Option<u32>,
        attendees: usize,
    },
    /// The draft passes validation.
    ValidDraft(OpportunityDraft),
}

impl Precondition {
    /// Evaluate against `now`.
    pub fn evaluate(&self, now: DateTime<Utc>) -> AppResult<()> {
        match self {
            Self::ActiveIdentity { active } => {
                if !active {
                    return Err(AppError::permission_denied("No active identity"));
                }
            }
            Self::NonAnonymous { anonymous } => {
                if *anonymous {
                    return Err(AppError::permission_denied(
                        "Anonymous users cannot RSVP; sign in first",
                    ));
                }
            }
            Self::Manager { role } => {
                if !role.is_manager() {
                    return Err(AppError::permission_denied(format!(
                        "Manager role required (current role: {role})"
                    )));
                }
            }
            Self::Creator { caller, creator } => {
                if caller != creator {
                    return Err(AppError::permission_denied(
                        "Only the creator can modify this opportunity",
                    ));
                }
            }
            Self::NotEnded { end } => {
                if now > *end {
                    return Err(AppError::invalid_state("This opportunity has already ended"));
                }
            }
            Self::NotOngoing { start, end } => {
                if *start <= now && now <= *end {
                    return Err(AppError::invalid_state(
                        "This opportunity is in progress; RSVPs cannot change now",
                    ));
                }
            }
            Self::HasCapacity {
                capacity,
                attendees,
            } => {
                if capacity.is_some_and(|c| *attendees >= c as usize) {
                    return Err(AppError::invalid_state("This opportunity is full"));
                }
            }
            Self::Attending {
                attendee,
                attending,
            } => {
                if !attending {
                    return Err(AppError::invalid_state(format!(
                        "{attendee} is not an attendee of this opportunity"
                    )));
                }
            }
            Self::CapacityCoversAttendees {
                capacity,
                attendees,
            } => {
                if capacity.is_some_and(|c| (c as usize) < *attendees) {
                    return Err(AppError::invalid_state(format!(
                        "Capacity cannot drop below the {attendees} current attendees"
                    )));
                }
            }
            Self::ValidDraft(draft) => draft.validate()?,
        }
        Ok(())
    }
}

/// Evaluate `preconditions` in order, stopping at the first failure.
pub fn evaluate_all(preconditions: &[Precondition], now: DateTime<Utc>) -> AppResult<()> {
    preconditions.iter().try_for_each(|p| p.evaluate(now))
}
