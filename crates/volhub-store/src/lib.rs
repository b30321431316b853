//! # volhub-store
//!
//! In-process implementation of the [`RemoteStore`] contract for VolHub.
//! It keeps collections of JSON documents behind one lock, applies commits
//! to a staged copy so a failure leaves nothing behind, and pushes the full
//! result set of every affected query to its subscribers after each commit.
//!
//! Besides backing the CLI and the demo binary, the store doubles as the
//! test store: faults can be injected into commits and subscriptions, and
//! commits can be parked in flight.
//!
//! [`RemoteStore`]: volhub_core::traits::RemoteStore

pub mod memory;
pub mod seed;

pub use memory::MemoryStore;
pub use memory::faults::FaultPlan;
