//! Opportunity domain entities.

pub mod attendance;
pub mod draft;
pub mod model;

pub use attendance::AttendanceStatus;
pub use draft::OpportunityDraft;
pub use model::Opportunity;
