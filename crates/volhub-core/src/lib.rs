//! # volhub-core
//!
//! Core crate for VolHub. Contains the remote store contract, configuration
//! schemas, typed identifiers, time windows, session events, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other VolHub crates.

pub mod config;
pub mod error;
pub mod events;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
