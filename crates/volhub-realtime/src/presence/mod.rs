//! Presence trigger and presentation host seam.

pub mod host;
pub mod state;
pub mod trigger;

pub use host::{HostCall, PresentationHost, RecordingHost, TracingHost, apply_actions};
pub use state::PresenceState;
pub use trigger::{PresenceAction, PresenceTrigger, PresentationSpec};
