//! # volhub-service
//!
//! Business logic layer for VolHub. It owns the pieces of session state
//! that have real rules behind them: optimistic membership sets, the
//! atomic mutation protocol with its preconditions, the transient error
//! board, and the hours leaderboard.
//!
//! Everything here is synchronous apart from [`MutationDispatcher`], which
//! talks to the remote store. Services follow constructor injection: the
//! store and clock are provided at construction time via `Arc` references.

pub mod alerts;
pub mod context;
pub mod dispatch;
pub mod leaderboard;
pub mod membership;

pub use alerts::{ErrorBoard, ExpiryTicket, SurfacedError};
pub use context::{Identity, SessionContext};
pub use dispatch::{MutationDispatcher, MutationKind, MutationRequest, Precondition};
pub use leaderboard::compute_leaderboard;
pub use membership::{MembershipDiff, MembershipSynchronizer, PendingToggle};
