//! Profile entity model.

use std::collections::BTreeSet;

use serde_json::{Map, Value, json};
use tracing::warn;

use volhub_core::error::AppError;
use volhub_core::types::{Document, DocumentRef, IdentityId, MembershipSet, OpportunityId};

use super::role::UserRole;
use crate::fields;

/// Per-identity profile document.
///
/// Owned by its identity. The RSVP subset is also written by managers when
/// they remove the identity from an opportunity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    /// Identity id; also the document id.
    pub id: IdentityId,
    /// Role.
    pub role: UserRole,
    /// Human-readable display name. May be empty.
    pub display_name: String,
    /// Favorited opportunities.
    pub favorite_ids: BTreeSet<OpportunityId>,
    /// Opportunities with an RSVP.
    pub rsvp_ids: BTreeSet<OpportunityId>,
}

impl Profile {
    /// A fresh profile with empty sets.
    pub fn new(id: IdentityId, role: UserRole, display_name: impl Into<String>) -> Self {
        Self {
            id,
            role,
            display_name: display_name.into(),
            favorite_ids: BTreeSet::new(),
            rsvp_ids: BTreeSet::new(),
        }
    }

    /// Decode a profile document.
    ///
    /// Unknown roles degrade to [`UserRole::Anonymous`]; unparsable set
    /// members are skipped.
    pub fn from_document(doc: &Document) -> Result<Self, AppError> {
        let id: IdentityId = doc.reference.id.parse().map_err(|e| {
            AppError::serialization(format!("Invalid identity id '{}': {e}", doc.reference.id))
        })?;

        let role = doc
            .fields
            .get(fields::ROLE)
            .and_then(Value::as_str)
            .map(UserRole::from_str_or_least)
            .unwrap_or(UserRole::Anonymous);

        let display_name = doc
            .fields
            .get(fields::DISPLAY_NAME)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(Self {
            id,
            role,
            display_name,
            favorite_ids: id_set(doc, fields::FAVORITE_IDS),
            rsvp_ids: id_set(doc, fields::RSVP_IDS),
        })
    }

    /// Encode the document fields.
    pub fn to_fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(fields::ROLE.into(), json!(self.role.as_str()));
        map.insert(fields::DISPLAY_NAME.into(), json!(self.display_name));
        map.insert(
            fields::FAVORITE_IDS.into(),
            json!(self.favorite_ids.iter().map(ToString::to_string).collect::<Vec<_>>()),
        );
        map.insert(
            fields::RSVP_IDS.into(),
            json!(self.rsvp_ids.iter().map(ToString::to_string).collect::<Vec<_>>()),
        );
        map
    }

    /// Reference to this profile's document.
    pub fn document_ref(&self) -> DocumentRef {
        Self::reference(self.id)
    }

    /// Reference to a profile document by identity id.
    pub fn reference(id: IdentityId) -> DocumentRef {
        DocumentRef::new(fields::USERS, id)
    }

    /// The set backing `set`.
    pub fn members(&self, set: MembershipSet) -> &BTreeSet<OpportunityId> {
        match set {
            MembershipSet::Favorites => &self.favorite_ids,
            MembershipSet::Rsvp => &self.rsvp_ids,
        }
    }

    /// Display name, or a deterministic fallback built from the id prefix.
    pub fn resolved_name(&self, prefix_len: usize) -> String {
        if self.display_name.trim().is_empty() {
            fallback_name(self.id, prefix_len)
        } else {
            self.display_name.clone()
        }
    }
}

/// Name shown for an identity whose profile has no usable display name.
pub fn fallback_name(id: IdentityId, prefix_len: usize) -> String {
    format!("Volunteer {}", id.short(prefix_len))
}

fn id_set(doc: &Document, field: &str) -> BTreeSet<OpportunityId> {
    let Some(items) = doc.fields.get(field).and_then(Value::as_array) else {
        return BTreeSet::new();
    };

    items
        .iter()
        .filter_map(|item| {
            let parsed = item.as_str().and_then(|s| s.parse().ok());
            if parsed.is_none() {
                warn!(document = %doc.reference, field, value = %item, "Skipping malformed id");
            }
            parsed
        })
        .collect()
}
