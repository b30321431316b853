//! Presence trigger: decides when presentations start, update, or end.
//!
//! The trigger is driven by two inputs, the caller's RSVP set and the wall
//! clock. It keeps one entry per live presentation and diffs the inputs
//! against those entries on every evaluation. It never talks to the host
//! itself; the returned actions are applied by the session.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use volhub_core::types::OpportunityId;
use volhub_entity::Opportunity;

use super::state::PresenceState;

/// Attributes a presentation is started with. Any change forces a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationSpec {
    pub opportunity_id: OpportunityId,
    pub name: String,
    pub location: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl PresentationSpec {
    pub fn of(opportunity: &Opportunity) -> Self {
        Self {
            opportunity_id: opportunity.id,
            name: opportunity.name.clone(),
            location: opportunity.location.clone(),
            start: opportunity.start,
            end: opportunity.end,
        }
    }
}

/// A change the presentation host must apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceAction {
    /// Start a presentation.
    Start {
        spec: PresentationSpec,
        state: PresenceState,
    },
    /// Change the displayed sub-state of a live presentation.
    Update {
        opportunity_id: OpportunityId,
        state: PresenceState,
    },
    /// Tear a presentation down.
    End {
        opportunity_id: OpportunityId,
        state: PresenceState,
    },
}

impl PresenceAction {
    pub fn opportunity_id(&self) -> OpportunityId {
        match self {
            Self::Start { spec, .. } => spec.opportunity_id,
            Self::Update { opportunity_id, .. } | Self::End { opportunity_id, .. } => {
                *opportunity_id
            }
        }
    }

    /// The state the presentation is left in after this action.
    pub fn state(&self) -> PresenceState {
        match self {
            Self::Start { state, .. } | Self::Update { state, .. } | Self::End { state, .. } => {
                *state
            }
        }
    }
}

#[derive(Debug, Clone)]
struct LivePresentation {
    spec: PresentationSpec,
    state: PresenceState,
}

/// Per-opportunity presentation state machine for one session.
#[derive(Debug)]
pub struct PresenceTrigger {
    lead_window: Duration,
    live: BTreeMap<OpportunityId, LivePresentation>,
}

impl PresenceTrigger {
    pub fn new(lead_window: Duration) -> Self {
        Self {
            lead_window,
            live: BTreeMap::new(),
        }
    }

    /// Diff the inputs against live presentations.
    pub fn evaluate(
        &mut self,
        opportunities: &BTreeMap<OpportunityId, Opportunity>,
        rsvp: &BTreeSet<OpportunityId>,
        now: DateTime<Utc>,
    ) -> Vec<PresenceAction> {
        let mut actions = Vec::new();

        let live_ids: Vec<OpportunityId> = self.live.keys().copied().collect();
        for id in live_ids {
            let Some(current) = self.live.get(&id).cloned() else {
                continue;
            };
            let opportunity = opportunities.get(&id);

            match opportunity {
                None => self.end(id, PresenceState::Inactive, &mut actions),
                Some(_) if !rsvp.contains(&id) => {
                    self.end(id, PresenceState::Inactive, &mut actions)
                }
                Some(opp) if opp.has_ended(now) => self.end(id, PresenceState::Ended, &mut actions),
                Some(opp) => {
                    let spec = PresentationSpec::of(opp);
                    let state = self.state_of(opp, now);
                    if spec != current.spec {
                        self.end(id, PresenceState::Inactive, &mut actions);
                        self.start(spec, state, &mut actions);
                    } else if state != current.state {
                        self.live.insert(id, LivePresentation { spec, state });
                        actions.push(PresenceAction::Update {
                            opportunity_id: id,
                            state,
                        });
                    }
                }
            }
        }

        let joining: Vec<OpportunityId> = rsvp
            .iter()
            .filter(|id| !self.live.contains_key(id))
            .copied()
            .collect();
        for id in joining {
            let Some(opp) = opportunities.get(&id) else {
                continue;
            };
            if opp.has_ended(now) {
                continue;
            }
            let state = self.state_of(opp, now);
            self.start(PresentationSpec::of(opp), state, &mut actions);
        }

        if !actions.is_empty() {
            debug!(actions = actions.len(), live = self.live.len(), "Presence re-evaluated");
        }
        actions
    }

    /// End every live presentation.
    pub fn end_all(&mut self) -> Vec<PresenceAction> {
        std::mem::take(&mut self.live)
            .into_keys()
            .map(|opportunity_id| PresenceAction::End {
                opportunity_id,
                state: PresenceState::Inactive,
            })
            .collect()
    }

    /// Displayed state per live presentation.
    pub fn states(&self) -> BTreeMap<OpportunityId, PresenceState> {
        self.live.iter().map(|(id, p)| (*id, p.state)).collect()
    }

    pub fn state(&self, id: OpportunityId) -> PresenceState {
        self.live
            .get(&id)
            .map_or(PresenceState::Inactive, |p| p.state)
    }

    fn state_of(&self, opportunity: &Opportunity, now: DateTime<Utc>) -> PresenceState {
        PresenceState::at(now, opportunity.start, opportunity.end, self.lead_window)
    }

    fn start(
        &mut self,
        spec: PresentationSpec,
        state: PresenceState,
        actions: &mut Vec<PresenceAction>,
    ) {
        self.live.insert(
            spec.opportunity_id,
            LivePresentation {
                spec: spec.clone(),
                state,
            },
        );
        actions.push(PresenceAction::Start { spec, state });
    }

    fn end(&mut self, id: OpportunityId, state: PresenceState, actions: &mut Vec<PresenceAction>) {
        if self.live.remove(&id).is_some() {
            actions.push(PresenceAction::End {
                opportunity_id: id,
                state,
            });
        }
    }
}
