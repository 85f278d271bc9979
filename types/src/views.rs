//! Pure ordering and filtering helpers over units and proposals.
//!
//! These never touch the store; callers apply them to snapshots.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::UnitId;
use crate::proposal::{Proposal, ProposalStatus, RewardStatus};
use crate::unit::Unit;

/// Highest stake first.
#[must_use]
pub fn compare_by_stake(a: &Unit, b: &Unit) -> Ordering {
    b.stake.cmp(&a.stake)
}

/// Longest dissolve delay first.
#[must_use]
pub fn compare_by_dissolve_delay(a: &Unit, b: &Unit) -> Ordering {
    b.dissolve_delay_seconds.cmp(&a.dissolve_delay_seconds)
}

/// Most recently created first.
#[must_use]
pub fn compare_by_created(a: &Unit, b: &Unit) -> Ordering {
    b.created_timestamp_seconds.cmp(&a.created_timestamp_seconds)
}

/// Ascending id order; the deterministic tie-breaker.
#[must_use]
pub fn compare_by_id(a: &Unit, b: &Unit) -> Ordering {
    a.id.cmp(&b.id)
}

/// Sort units by a comparator chain: later comparators break ties left by
/// earlier ones.
pub fn sort_units(units: &mut [Unit], comparators: &[fn(&Unit, &Unit) -> Ordering]) {
    units.sort_by(|a, b| {
        comparators
            .iter()
            .map(|compare| compare(a, b))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Status-based proposal filter. Empty sets mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalFilter {
    pub statuses: BTreeSet<ProposalStatus>,
    pub reward_statuses: BTreeSet<RewardStatus>,
}

impl ProposalFilter {
    #[must_use]
    pub fn matches(&self, proposal: &Proposal) -> bool {
        let status_ok = self.statuses.is_empty() || self.statuses.contains(&proposal.status);
        let reward_ok = self.reward_statuses.is_empty()
            || self.reward_statuses.contains(&proposal.reward_status);
        status_ok && reward_ok
    }
}

/// Retain the proposals matching `filter`, preserving order.
#[must_use]
pub fn filter_proposals(proposals: Vec<Proposal>, filter: &ProposalFilter) -> Vec<Proposal> {
    proposals
        .into_iter()
        .filter(|proposal| filter.matches(proposal))
        .collect()
}

/// The standard actionable test: the proposal is open, still accepting
/// votes, and holds an uncast ballot for at least one of the given units.
#[must_use]
pub fn is_actionable(proposal: &Proposal, unit_ids: &BTreeSet<UnitId>) -> bool {
    proposal.status.is_open()
        && proposal.reward_status.accepts_votes()
        && unit_ids.iter().any(|unit| proposal.accepts_vote_from(unit))
}

/// Build the standard actionable predicate over a fixed unit set, e.g. to
/// hand to a projection when the caller's units have been loaded.
pub fn actionable_for_units(
    units: impl IntoIterator<Item = UnitId>,
) -> impl Fn(&Proposal) -> bool + Send + Sync + 'static {
    let units: BTreeSet<UnitId> = units.into_iter().collect();
    move |proposal| is_actionable(proposal, &units)
}
