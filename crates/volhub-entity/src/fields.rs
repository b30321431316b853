//! Collection and field names of the persisted document shapes.

/// Collection holding opportunity documents.
pub const OPPORTUNITIES: &str = "opportunities";
/// Collection holding profile documents, keyed by identity id.
pub const USERS: &str = "users";

/// Opportunity: display name.
pub const NAME: &str = "name";
/// Opportunity: free-form location.
pub const LOCATION: &str = "location";
/// Opportunity: free-text description.
pub const DESCRIPTION: &str = "description";
/// Opportunity: start instant (RFC 3339).
pub const START_INSTANT: &str = "startInstant";
/// Opportunity: end instant (RFC 3339).
pub const END_INSTANT: &str = "endInstant";
/// Opportunity: creating identity.
pub const CREATOR_ID: &str = "creatorId";
/// Opportunity: optional capacity.
pub const CAPACITY: &str = "capacity";
/// Opportunity: attendee identity ids.
pub const ATTENDEE_IDS: &str = "attendeeIds";
/// Opportunity: identity id → attendance status.
pub const ATTENDANCE_RECORDS: &str = "attendanceRecords";

/// Profile: role.
pub const ROLE: &str = "role";
/// Profile: display name.
pub const DISPLAY_NAME: &str = "displayName";
/// Profile: favorited opportunity ids.
pub const FAVORITE_IDS: &str = "favoriteIds";
/// Profile: RSVP'd opportunity ids.
pub const RSVP_IDS: &str = "rsvpIds";

/// Dotted path of one attendee's attendance entry.
pub fn attendance_entry(identity_id: &impl ToString) -> String {
    format!("{ATTENDANCE_RECORDS}.{}", identity_id.to_string())
}

/// Profile field backing a membership set.
pub fn membership_field(set: volhub_core::types::MembershipSet) -> &'static str {
    match set {
        volhub_core::types::MembershipSet::Favorites => FAVORITE_IDS,
        volhub_core::types::MembershipSet::Rsvp => RSVP_IDS,
    }
}
