//! Atomic multi-record mutation protocol.
//!
//! A mutation is described by a [`MutationRequest`]: the preconditions it
//! must pass and the ordered writes it commits as one unit. The write-set
//! builders in [`writes`] know which documents each operation touches; the
//! [`MutationDispatcher`] checks preconditions and talks to the store.

pub mod dispatcher;
pub mod operation;
pub mod precondition;
pub mod writes;

pub use dispatcher::MutationDispatcher;
pub use operation::{MutationKind, MutationRequest};
pub use precondition::Precondition;
