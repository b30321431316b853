//! Leaderboard value objects.

pub mod entry;

pub use entry::RankedEntry;
