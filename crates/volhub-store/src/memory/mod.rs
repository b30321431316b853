//! In-memory document store.

pub mod apply;
pub mod faults;
pub mod store;

pub use store::MemoryStore;
