//! Events emitted by an identity session.
//!
//! Every state change applied by the session coordinator produces one
//! [`SessionEvent`]. Downstream consumers (UI, presence hosts, tests)
//! subscribe to these instead of polling state.

pub mod session;

pub use session::{ChangeCause, SessionEvent};
