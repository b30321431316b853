//! Write-set builders for every mutation the session can dispatch.
//!
//! Each builder captures the preconditions and the complete set of
//! documents the operation touches. Everything in one request lands in a
//! single atomic commit.

use serde_json::Value;

use volhub_core::result::AppResult;
use volhub_core::types::{FieldOp, IdentityId, MembershipSet, OpportunityId, Write};
use volhub_entity::{AttendanceStatus, Opportunity, OpportunityDraft, Profile, fields};

use super::operation::{MutationKind, MutationRequest};
use super::precondition::Precondition;
use crate::context::SessionContext;

fn id_value(id: &impl ToString) -> Value {
    Value::String(id.to_string())
}

fn array_op(adding: bool, value: Value) -> FieldOp {
    if adding {
        FieldOp::ArrayUnion(value)
    } else {
        FieldOp::ArrayRemove(value)
    }
}

/// RSVP add or remove for the acting identity.
///
/// Attendance entries are left alone on removal; only a manager removal
/// clears them.
pub fn rsvp(ctx: &SessionContext, opportunity: &Opportunity, adding: bool) -> MutationRequest {
    let identity = ctx.identity_id();
    let kind = if adding {
        MutationKind::RsvpAdd
    } else {
        MutationKind::RsvpRemove
    };

    let mut request = MutationRequest::new(kind)
        .require(Precondition::ActiveIdentity { active: ctx.active })
        .require(Precondition::NonAnonymous {
            anonymous: ctx.is_anonymous(),
        })
        .require(Precondition::NotEnded {
            end: opportunity.end,
        })
        .require(Precondition::NotOngoing {
            start: opportunity.start,
            end: opportunity.end,
        });
    if adding {
        request = request.require(Precondition::HasCapacity {
            capacity: opportunity.capacity,
            attendees: opportunity.attendee_ids.len(),
        });
    }

    request
        .write(Write::field(
            opportunity.document_ref(),
            fields::ATTENDEE_IDS,
            array_op(adding, id_value(&identity)),
        ))
        .write(Write::field(
            Profile::reference(identity),
            fields::membership_field(MembershipSet::Rsvp),
            array_op(adding, id_value(&opportunity.id)),
        ))
}

/// Favorite add or remove. Single-document, but dispatched through the
/// same path so failures surface uniformly.
pub fn favorite(
    ctx: &SessionContext,
    opportunity_id: OpportunityId,
    adding: bool,
) -> MutationRequest {
    let kind = if adding {
        MutationKind::FavoriteAdd
    } else {
        MutationKind::FavoriteRemove
    };
    MutationRequest::new(kind)
        .require(Precondition::ActiveIdentity { active: ctx.active })
        .write(Write::field(
            Profile::reference(ctx.identity_id()),
            fields::membership_field(MembershipSet::Favorites),
            array_op(adding, id_value(&opportunity_id)),
        ))
}

/// Set or clear one attendee's attendance status.
pub fn attendance(
    ctx: &SessionContext,
    opportunity: &Opportunity,
    attendee: IdentityId,
    status: Option<AttendanceStatus>,
) -> MutationRequest {
    let mut request = MutationRequest::new(MutationKind::RecordAttendance)
        .require(Precondition::ActiveIdentity { active: ctx.active })
        .require(Precondition::Manager { role: ctx.role });

    let op = match status {
        Some(status) => {
            request = request.require(Precondition::Attending {
                attendee,
                attending: opportunity.is_attendee(attendee),
            });
            FieldOp::Set(Value::String(status.as_str().to_string()))
        }
        None => FieldOp::Delete,
    };

    request.write(Write::field(
        opportunity.document_ref(),
        fields::attendance_entry(&attendee),
        op,
    ))
}

/// Manager-initiated removal of an attendee: both sides of the RSVP
/// pairing plus the attendance entry.
pub fn manager_removal(
    ctx: &SessionContext,
    opportunity: &Opportunity,
    attendee: IdentityId,
) -> MutationRequest {
    MutationRequest::new(MutationKind::ManagerRemoval)
        .require(Precondition::ActiveIdentity { active: ctx.active })
        .require(Precondition::Manager { role: ctx.role })
        .write(Write::field(
            opportunity.document_ref(),
            fields::ATTENDEE_IDS,
            FieldOp::ArrayRemove(id_value(&attendee)),
        ))
        .write(Write::field(
            Profile::reference(attendee),
            fields::RSVP_IDS,
            FieldOp::ArrayRemove(id_value(&opportunity.id)),
        ))
        .write(Write::field(
            opportunity.document_ref(),
            fields::attendance_entry(&attendee),
            FieldOp::Delete,
        ))
}

/// Create a new opportunity owned by the caller.
pub fn create_opportunity(
    ctx: &SessionContext,
    id: OpportunityId,
    draft: OpportunityDraft,
) -> AppResult<MutationRequest> {
    let request = MutationRequest::new(MutationKind::CreateOpportunity)
        .require(Precondition::ActiveIdentity { active: ctx.active })
        .require(Precondition::Manager { role: ctx.role })
        .require(Precondition::ValidDraft(draft.clone()));

    let opportunity = draft.into_opportunity(id, ctx.identity_id());
    Ok(request.write(Write::Create {
        document: opportunity.document_ref(),
        fields: opportunity.to_fields()?,
    }))
}

/// Replace the editable attributes of an existing opportunity.
pub fn update_opportunity(
    ctx: &SessionContext,
    existing: &Opportunity,
    draft: OpportunityDraft,
) -> AppResult<MutationRequest> {
    let document = existing.document_ref();
    let capacity = match draft.capacity {
        Some(capacity) => FieldOp::Set(Value::from(capacity)),
        None => FieldOp::Delete,
    };

    let request = MutationRequest::new(MutationKind::UpdateOpportunity)
        .require(Precondition::ActiveIdentity { active: ctx.active })
        .require(Precondition::Manager { role: ctx.role })
        .require(Precondition::Creator {
            caller: ctx.identity_id(),
            creator: existing.creator_id,
        })
        .require(Precondition::NotEnded { end: existing.end })
        .require(Precondition::CapacityCoversAttendees {
            capacity: draft.capacity,
            attendees: existing.attendee_ids.len(),
        })
        .require(Precondition::ValidDraft(draft.clone()))
        .write(Write::field(
            document.clone(),
            fields::NAME,
            FieldOp::Set(Value::String(draft.name)),
        ))
        .write(Write::field(
            document.clone(),
            fields::LOCATION,
            FieldOp::Set(Value::String(draft.location)),
        ))
        .write(Write::field(
            document.clone(),
            fields::DESCRIPTION,
            FieldOp::Set(Value::String(draft.description)),
        ))
        .write(Write::field(
            document.clone(),
            fields::START_INSTANT,
            FieldOp::Set(serde_json::to_value(draft.start)?),
        ))
        .write(Write::field(
            document.clone(),
            fields::END_INSTANT,
            FieldOp::Set(serde_json::to_value(draft.end)?),
        ))
        .write(Write::field(document, fields::CAPACITY, capacity));

    Ok(request)
}

/// Delete an opportunity and detach it from every attendee's RSVP set.
pub fn delete_opportunity(ctx: &SessionContext, existing: &Opportunity) -> MutationRequest {
    let request = MutationRequest::new(MutationKind::DeleteOpportunity)
        .require(Precondition::ActiveIdentity { active: ctx.active })
        .require(Precondition::Manager { role: ctx.role })
        .require(Precondition::Creator {
            caller: ctx.identity_id(),
            creator: existing.creator_id,
        })
        .require(Precondition::NotEnded { end: existing.end })
        .write(Write::DeleteDocument {
            document: existing.document_ref(),
        });

    existing.attendee_ids.iter().fold(request, |request, attendee| {
        request.write(Write::field(
            Profile::reference(*attendee),
            fields::RSVP_IDS,
            FieldOp::ArrayRemove(id_value(&existing.id)),
        ))
    })
}
