//! Proposals and their ballot sets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ids::{ProposalId, UnitId};
use crate::vote::Vote;

/// Lifecycle status of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProposalStatus {
    Open,
    Adopted,
    Rejected,
    Executed,
    Failed,
}

impl ProposalStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProposalStatus::Open => "open",
            ProposalStatus::Adopted => "adopted",
            ProposalStatus::Rejected => "rejected",
            ProposalStatus::Executed => "executed",
            ProposalStatus::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, ProposalStatus::Open)
    }
}

/// Reward status of a proposal: whether votes are still being accepted for
/// voting rewards, or the reward round has settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RewardStatus {
    AcceptVotes,
    ReadyToSettle,
    Settled,
}

impl RewardStatus {
    #[must_use]
    pub fn accepts_votes(self) -> bool {
        matches!(self, RewardStatus::AcceptVotes)
    }
}

/// One unit's vote record within a proposal.
///
/// Until the unit votes, `vote` is [`Vote::Unspecified`] and the cast
/// timestamp is zero. `voting_power` is the power snapshot taken when the
/// ballot was created, not the unit's live stake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub vote: Vote,
    pub cast_timestamp_seconds: u64,
    pub voting_power: u64,
}

impl Ballot {
    /// A fresh, uncast ballot with the given voting-power snapshot.
    #[must_use]
    pub fn uncast(voting_power: u64) -> Self {
        Self {
            vote: Vote::Unspecified,
            cast_timestamp_seconds: 0,
            voting_power,
        }
    }

    #[must_use]
    pub fn is_uncast(&self) -> bool {
        self.vote == Vote::Unspecified
    }
}

/// Voting-power sums for a proposal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yes: u64,
    pub no: u64,
    pub total: u64,
}

/// An action under vote in one governance system.
///
/// The ballot set maps each eligible unit to its ballot; keys are unique per
/// proposal. Records are replaced wholesale by reads and patched ballot-wise
/// by the vote orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    /// Action (proposal function) identifier, used by hosts to label the
    /// proposal type. Not interpreted by the core.
    pub action: u64,
    pub ballots: BTreeMap<UnitId, Ballot>,
    pub tally: Tally,
    pub status: ProposalStatus,
    pub reward_status: RewardStatus,
    pub created_timestamp_seconds: u64,
}

impl Proposal {
    #[must_use]
    pub fn ballot(&self, unit: &UnitId) -> Option<&Ballot> {
        self.ballots.get(unit)
    }

    /// Whether the given unit currently holds an uncast ballot here.
    ///
    /// Units without a ballot entry are not eligible; units whose ballot has
    /// already been cast are not eligible again.
    #[must_use]
    pub fn accepts_vote_from(&self, unit: &UnitId) -> bool {
        self.ballots.get(unit).is_some_and(Ballot::is_uncast)
    }

    /// Record a cast vote on the unit's ballot.
    ///
    /// Returns `false` (and changes nothing) when the unit holds no ballot.
    pub fn record_vote(&mut self, unit: &UnitId, vote: Vote) -> bool {
        match self.ballots.get_mut(unit) {
            Some(ballot) => {
                ballot.vote = vote;
                true
            }
            None => false,
        }
    }
}
