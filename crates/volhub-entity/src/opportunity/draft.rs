//! Create/update payload for opportunities.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use volhub_core::error::AppError;
use volhub_core::types::{IdentityId, OpportunityId};

use super::model::Opportunity;

/// Editable attributes of an opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpportunityDraft {
    /// Display name.
    pub name: String,
    /// Free-form location string.
    pub location: String,
    /// Free-text description.
    pub description: String,
    /// Start instant.
    pub start: DateTime<Utc>,
    /// End instant.
    pub end: DateTime<Utc>,
    /// Maximum number of attendees.
    pub capacity: Option<u32>,
}

impl OpportunityDraft {
    /// Check the draft's own consistency.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::invalid_state("Opportunity name must not be empty"));
        }
        if self.end <= self.start {
            return Err(AppError::invalid_state("Opportunity must end after it starts"));
        }
        if self.capacity == Some(0) {
            return Err(AppError::invalid_state("Capacity must be at least 1"));
        }
        Ok(())
    }

    /// Materialize a new opportunity created by `creator_id`.
    pub fn into_opportunity(self, id: OpportunityId, creator_id: IdentityId) -> Opportunity {
        Opportunity {
            id,
            name: self.name,
            location: self.location,
            description: self.description,
            start: self.start,
            end: self.end,
            creator_id,
            capacity: self.capacity,
            attendee_ids: BTreeSet::new(),
            attendance: BTreeMap::new(),
        }
    }

    /// Draft pre-filled from an existing opportunity.
    pub fn from_opportunity(opportunity: &Opportunity) -> Self {
        Self {
            name: opportunity.name.clone(),
            location: opportunity.location.clone(),
            description: opportunity.description.clone(),
            start: opportunity.start,
            end: opportunity.end,
            capacity: opportunity.capacity,
        }
    }
}
