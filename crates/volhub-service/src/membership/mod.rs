//! Optimistic set-membership synchronization.

pub mod diff;
pub mod synchronizer;

pub use diff::MembershipDiff;
pub use synchronizer::{MembershipSynchronizer, PendingToggle};
