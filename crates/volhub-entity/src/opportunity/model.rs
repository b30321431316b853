//! Opportunity entity model.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use volhub_core::error::AppError;
use volhub_core::types::{Document, DocumentRef, IdentityId, OpportunityId};

use super::attendance::AttendanceStatus;
use crate::fields;

/// A time-boxed event members can reserve a spot at.
///
/// Lifecycle: created by a manager, mutated by capacity/attendee/attendance
/// changes, deleted by its creator. Once [`Opportunity::has_ended`] holds,
/// RSVP changes, edits, and deletion are prohibited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    /// Document id.
    #[serde(skip)]
    pub id: OpportunityId,
    /// Display name.
    pub name: String,
    /// Free-form location string.
    #[serde(default)]
    pub location: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Start instant.
    #[serde(rename = "startInstant")]
    pub start: DateTime<Utc>,
    /// End instant, strictly after `start`.
    #[serde(rename = "endInstant")]
    pub end: DateTime<Utc>,
    /// The identity that created the opportunity.
    #[serde(rename = "creatorId")]
    pub creator_id: IdentityId,
    /// Maximum number of attendees. `None` means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
    /// Identities holding an RSVP.
    #[serde(rename = "attendeeIds", default)]
    pub attendee_ids: BTreeSet<IdentityId>,
    /// Attendance per attendee. Absence of a key means unmarked.
    #[serde(rename = "attendanceRecords", default)]
    pub attendance: BTreeMap<IdentityId, AttendanceStatus>,
}

impl Opportunity {
    /// Decode an opportunity from a store document.
    pub fn from_document(doc: &Document) -> Result<Self, AppError> {
        let id: OpportunityId = doc.reference.id.parse().map_err(|e| {
            AppError::serialization(format!("Invalid opportunity id '{}': {e}", doc.reference.id))
        })?;
        let mut opportunity: Self = serde_json::from_value(Value::Object(doc.fields.clone()))?;
        opportunity.id = id;

        if opportunity.end <= opportunity.start {
            return Err(AppError::serialization(format!(
                "Opportunity {id} ends before it starts"
            )));
        }

        Ok(opportunity)
    }

    /// Encode the document fields.
    pub fn to_fields(&self) -> Result<Map<String, Value>, AppError> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            _ => Err(AppError::serialization("Opportunity did not encode as an object")),
        }
    }

    /// Reference to this opportunity's document.
    pub fn document_ref(&self) -> DocumentRef {
        Self::reference(self.id)
    }

    /// Reference to an opportunity document by id.
    pub fn reference(id: OpportunityId) -> DocumentRef {
        DocumentRef::new(fields::OPPORTUNITIES, id)
    }

    /// Capacity is set and reached.
    pub fn is_full(&self) -> bool {
        self.capacity
            .is_some_and(|capacity| self.attendee_ids.len() >= capacity as usize)
    }

    /// `now` is past the end instant.
    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end
    }

    /// `now` is within `[start, end]`.
    pub fn is_currently_occurring(&self, now: DateTime<Utc>) -> bool {
        self.start <= now && now <= self.end
    }

    /// Length of the opportunity in hours.
    pub fn duration_hours(&self) -> f64 {
        self.duration_seconds() as f64 / 3600.0
    }

    /// Whole seconds between start and end.
    pub fn duration_seconds(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    /// Whether `identity_id` holds an RSVP.
    pub fn is_attendee(&self, identity_id: IdentityId) -> bool {
        self.attendee_ids.contains(&identity_id)
    }

    /// Spots left, or `None` when unlimited.
    pub fn remaining_spots(&self) -> Option<u32> {
        self.capacity
            .map(|capacity| capacity.saturating_sub(self.attendee_ids.len() as u32))
    }

    /// Identities marked present.
    pub fn present_attendees(&self) -> impl Iterator<Item = IdentityId> + '_ {
        self.attendance
            .iter()
            .filter(|(_, status)| **status == AttendanceStatus::Present)
            .map(|(id, _)| *id)
    }
}
