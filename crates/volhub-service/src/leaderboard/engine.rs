//! Time-windowed hours aggregation with competition ranking.
//!
//! The leaderboard is recomputed from scratch on every call. Only
//! opportunities starting inside the window count, and only `present`
//! attendance contributes the opportunity's full duration. Totals are kept
//! in whole seconds so equal service time always shares a rank.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use tracing::debug;

use volhub_core::config::LeaderboardConfig;
use volhub_core::types::{IdentityId, TimeWindow};
use volhub_entity::profile::fallback_name;
use volhub_entity::{Opportunity, Profile, RankedEntry};

/// Compute the ranked leaderboard for `window` anchored at `now`.
pub fn compute_leaderboard(
    opportunities: &[Opportunity],
    profiles: &[Profile],
    window: TimeWindow,
    now: DateTime<Utc>,
    config: &LeaderboardConfig,
) -> Vec<RankedEntry> {
    let offset = config.offset();

    let mut totals: BTreeMap<IdentityId, i64> = BTreeMap::new();
    let mut counted = 0usize;
    for opportunity in opportunities
        .iter()
        .filter(|o| window.contains(o.start, now, offset))
    {
        counted += 1;
        let seconds = opportunity.duration_seconds();
        for identity in opportunity.present_attendees() {
            *totals.entry(identity).or_insert(0) += seconds;
        }
    }

    let names: HashMap<IdentityId, &Profile> = profiles.iter().map(|p| (p.id, p)).collect();
    let mut entries: Vec<RankedEntry> = totals
        .into_iter()
        .filter(|(_, seconds)| *seconds > 0)
        .map(|(identity, seconds)| {
            let name = names
                .get(&identity)
                .map(|p| p.resolved_name(config.fallback_prefix_len))
                .unwrap_or_else(|| fallback_name(identity, config.fallback_prefix_len));
            RankedEntry::new(identity, name, seconds)
        })
        .collect();

    entries.sort_by(|a, b| {
        b.seconds
            .cmp(&a.seconds)
            .then_with(|| a.display_name.cmp(&b.display_name))
            .then_with(|| a.identity_id.cmp(&b.identity_id))
    });
    assign_ranks(&mut entries);

    debug!(%window, opportunities = counted, entries = entries.len(), "Leaderboard computed");
    entries
}

/// Stamp competition ranks onto entries already sorted by time descending.
/// Equal totals share a rank; the next distinct value gets the next rank.
pub fn assign_ranks(entries: &mut [RankedEntry]) {
    let mut rank = 0u32;
    let mut previous = -1_i64;
    for entry in entries.iter_mut() {
        if entry.seconds != previous {
            rank += 1;
            previous = entry.seconds;
        }
        entry.rank = Some(rank);
    }
}
