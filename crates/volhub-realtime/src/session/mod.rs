//! Per-identity session: coordination loop, handle, and manager.

pub mod command;
mod coordinator;
pub mod handle;
pub mod manager;
pub mod snapshot;

pub use handle::Session;
pub use manager::SessionManager;
pub use snapshot::SessionSnapshot;
