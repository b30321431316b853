//! Locally-believed membership sets with optimistic toggles.
//!
//! The synchronizer is plain synchronous state. It is owned by the session
//! coordinator, which serializes every call onto one task; nothing here
//! locks or suspends.
//!
//! A toggle flips the local bit immediately and records the value it saw
//! before flipping. The commit outcome later either confirms the toggle
//! (the local value already matches the server) or reverts it to that
//! recorded value. Authoritative snapshots replace a set wholesale at any
//! time, including while toggles are in flight.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use volhub_core::events::ChangeCause;
use volhub_core::types::{MembershipSet, OpportunityId};
use volhub_entity::Profile;

use super::diff::MembershipDiff;

/// A toggle whose remote commit has not completed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingToggle {
    /// Set being toggled.
    pub set: MembershipSet,
    /// Member being toggled.
    pub member: OpportunityId,
    /// Membership bit at the moment of the toggle call.
    pub was_member: bool,
    /// Monotonic per-synchronizer sequence number.
    pub sequence: u64,
}

impl PendingToggle {
    /// Whether the remote operation adds the member.
    pub fn adds(&self) -> bool {
        !self.was_member
    }
}

/// Membership sets for one identity session.
#[derive(Debug, Default)]
pub struct MembershipSynchronizer {
    sets: BTreeMap<MembershipSet, BTreeSet<OpportunityId>>,
    pending: BTreeMap<u64, PendingToggle>,
    next_sequence: u64,
}

impl MembershipSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `member` is currently believed to be in `set`.
    pub fn is_member(&self, set: MembershipSet, member: OpportunityId) -> bool {
        self.sets.get(&set).is_some_and(|s| s.contains(&member))
    }

    /// The currently believed members of `set`.
    pub fn members(&self, set: MembershipSet) -> BTreeSet<OpportunityId> {
        self.sets.get(&set).cloned().unwrap_or_default()
    }

    /// Whether any toggle on `(set, member)` is awaiting its commit.
    pub fn is_toggling(&self, set: MembershipSet, member: OpportunityId) -> bool {
        self.pending
            .values()
            .any(|p| p.set == set && p.member == member)
    }

    /// Number of toggles awaiting their commit.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Flip the local bit and record the pre-toggle value.
    pub fn begin_toggle(
        &mut self,
        set: MembershipSet,
        member: OpportunityId,
    ) -> (PendingToggle, MembershipDiff) {
        let was_member = self.is_member(set, member);
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let toggle = PendingToggle {
            set,
            member,
            was_member,
            sequence,
        };
        self.pending.insert(sequence, toggle);
        let diff = self.write_bit(set, member, !was_member, ChangeCause::Optimistic);

        debug!(%set, %member, was_member, sequence, "Optimistic toggle applied");
        (toggle, diff)
    }

    /// The commit for `toggle` succeeded. The local value is left standing.
    pub fn confirm(&mut self, toggle: &PendingToggle) -> bool {
        self.pending.remove(&toggle.sequence).is_some()
    }

    /// The commit for `toggle` failed. Re-apply its pre-toggle value.
    pub fn revert(&mut self, toggle: &PendingToggle) -> MembershipDiff {
        self.pending.remove(&toggle.sequence);
        let diff = self.write_bit(
            toggle.set,
            toggle.member,
            toggle.was_member,
            ChangeCause::Reverted,
        );
        info!(
            set = %toggle.set,
            member = %toggle.member,
            restored = toggle.was_member,
            "Toggle reverted"
        );
        diff
    }

    /// Replace `set` with the authoritative value.
    pub fn on_authoritative_snapshot(
        &mut self,
        set: MembershipSet,
        members: BTreeSet<OpportunityId>,
    ) -> MembershipDiff {
        let current = self.sets.entry(set).or_default();
        let diff = MembershipDiff {
            set,
            added: members.difference(current).copied().collect(),
            removed: current.difference(&members).copied().collect(),
            cause: ChangeCause::Authoritative,
        };
        *current = members;
        diff
    }

    /// Replace every set from a profile snapshot.
    pub fn apply_profile(&mut self, profile: &Profile) -> Vec<MembershipDiff> {
        MembershipSet::ALL
            .iter()
            .map(|&set| self.on_authoritative_snapshot(set, profile.members(set).clone()))
            .filter(|diff| !diff.is_empty())
            .collect()
    }

    /// Drop all sets and pending toggles.
    pub fn clear(&mut self) {
        self.sets.clear();
        self.pending.clear();
    }

    fn write_bit(
        &mut self,
        set: MembershipSet,
        member: OpportunityId,
        is_member: bool,
        cause: ChangeCause,
    ) -> MembershipDiff {
        let members = self.sets.entry(set).or_default();
        let mut diff = MembershipDiff::empty(set, cause);
        if is_member {
            if members.insert(member) {
                diff.added.push(member);
            }
        } else if members.remove(&member) {
            diff.removed.push(member);
        }
        diff
    }
}
