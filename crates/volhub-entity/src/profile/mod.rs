//! Identity-scoped profile entities.

pub mod model;
pub mod role;

pub use model::{Profile, fallback_name};
pub use role::UserRole;
