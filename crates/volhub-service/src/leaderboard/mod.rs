//! Hours leaderboard aggregation.

pub mod engine;

pub use engine::{assign_ranks, compute_leaderboard};
