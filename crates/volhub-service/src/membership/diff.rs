//! Membership changes produced by synchronizer mutations.

use volhub_core::events::{ChangeCause, SessionEvent};
use volhub_core::types::{MembershipSet, OpportunityId};

/// The members that entered or left one set in a single mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDiff {
    pub set: MembershipSet,
    pub added: Vec<OpportunityId>,
    pub removed: Vec<OpportunityId>,
    pub cause: ChangeCause,
}

impl MembershipDiff {
    pub fn empty(set: MembershipSet, cause: ChangeCause) -> Self {
        Self {
            set,
            added: Vec::new(),
            removed: Vec::new(),
            cause,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// One `MembershipChanged` event per changed member.
    pub fn into_events(self) -> Vec<SessionEvent> {
        let Self {
            set,
            added,
            removed,
            cause,
        } = self;
        added
            .into_iter()
            .map(|member| (member, true))
            .chain(removed.into_iter().map(|member| (member, false)))
            .map(|(member, is_member)| SessionEvent::MembershipChanged {
                set,
                member,
                is_member,
                cause,
            })
            .collect()
    }
}
