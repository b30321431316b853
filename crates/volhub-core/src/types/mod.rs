//! Core type definitions used across the VolHub workspace.

pub mod category;
pub mod document;
pub mod id;
pub mod window;

pub use category::{ErrorCategory, MembershipSet};
pub use document::{Document, DocumentRef, FieldFilter, FieldOp, Query, Write};
pub use id::*;
pub use window::TimeWindow;
