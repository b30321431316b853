//! # volhub-realtime
//!
//! Live side of a VolHub session. Provides:
//!
//! - The per-identity coordination loop that owns all session state and
//!   serializes listener snapshots, commit completions, user commands and
//!   the periodic refresh tick
//! - Presence tracking for RSVP'd opportunities (upcoming / starting soon /
//!   ongoing / ended) and the presentation host seam
//! - Identity switching with full teardown between sessions

pub mod presence;
pub mod session;

pub use presence::{PresenceState, PresenceTrigger, PresentationHost, RecordingHost, TracingHost};
pub use session::{Session, SessionManager, SessionSnapshot};
