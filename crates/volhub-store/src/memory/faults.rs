//! Fault injection for the in-memory store.

use serde::{Deserialize, Serialize};

/// Faults applied to upcoming store operations.
///
/// Commit faults are consumed one commit at a time; subscription faults
/// stay in force until cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultPlan {
    /// Fail the next commit after this many of its writes were applied.
    pub fail_after_writes: Option<usize>,
    /// Fail this many upcoming commits before applying any write.
    pub failing_commits: u32,
    /// Reject new subscriptions.
    pub reject_subscriptions: bool,
}

impl FaultPlan {
    /// No faults.
    pub fn none() -> Self {
        Self::default()
    }

    /// Fail the next `count` commits outright.
    pub fn failing_commits(count: u32) -> Self {
        Self {
            failing_commits: count,
            ..Self::default()
        }
    }

    /// Fail the next commit partway through, after `writes` writes.
    pub fn fail_after_writes(writes: usize) -> Self {
        Self {
            fail_after_writes: Some(writes),
            ..Self::default()
        }
    }

    /// Take the commit fault for the next commit, if any.
    ///
    /// Returns `Some(n)` when the commit must fail after `n` writes.
    pub(crate) fn take_commit_fault(&mut self) -> Option<usize> {
        if self.failing_commits > 0 {
            self.failing_commits -= 1;
            return Some(0);
        }
        self.fail_after_writes.take()
    }
}
