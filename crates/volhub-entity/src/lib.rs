//! # volhub-entity
//!
//! Domain entity models for VolHub. Every struct in this crate represents
//! a remote document or a derived value object. Documents are mapped to
//! and from the store's JSON field maps through the `from_document` /
//! `to_fields` pairs; field names live in [`fields`].

pub mod fields;
pub mod leaderboard;
pub mod opportunity;
pub mod profile;

pub use leaderboard::RankedEntry;
pub use opportunity::{AttendanceStatus, Opportunity, OpportunityDraft};
pub use profile::{Profile, UserRole};
