//! Read domains: the typed requests and responses exchanged with a
//! governance system's data source, and the entity unions the store keys by.

use serde::{Deserialize, Serialize};

use crate::ids::{EmptyIdError, ProposalId, UnitId};
use crate::proposal::{Proposal, RewardStatus};
use crate::unit::Unit;

/// Default page size for proposal queries.
pub const DEFAULT_PROPOSAL_PAGE_LIMIT: u32 = 20;

/// Freshness tier of a read result.
///
/// A certified value may always overwrite anything for the same key; an
/// uncertified value must never downgrade a certified one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Freshness {
    Uncertified,
    Certified,
}

impl Freshness {
    #[must_use]
    pub fn is_certified(self) -> bool {
        matches!(self, Freshness::Certified)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Freshness::Uncertified => "uncertified",
            Freshness::Certified => "certified",
        }
    }
}

/// The entity kinds the store distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityKind {
    Unit,
    Proposal,
}

/// Key of one entity within a governance system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityId {
    Unit(UnitId),
    Proposal(ProposalId),
}

impl EntityId {
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityId::Unit(_) => EntityKind::Unit,
            EntityId::Proposal(_) => EntityKind::Proposal,
        }
    }
}

/// A versioned record held by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entity {
    Unit(Unit),
    Proposal(Proposal),
}

impl Entity {
    #[must_use]
    pub fn id(&self) -> EntityId {
        match self {
            Entity::Unit(unit) => EntityId::Unit(unit.id.clone()),
            Entity::Proposal(proposal) => EntityId::Proposal(proposal.id),
        }
    }

    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Unit(_) => EntityKind::Unit,
            Entity::Proposal(_) => EntityKind::Proposal,
        }
    }

    #[must_use]
    pub fn as_proposal(&self) -> Option<&Proposal> {
        match self {
            Entity::Proposal(proposal) => Some(proposal),
            Entity::Unit(_) => None,
        }
    }

    #[must_use]
    pub fn as_unit(&self) -> Option<&Unit> {
        match self {
            Entity::Unit(unit) => Some(unit),
            Entity::Proposal(_) => None,
        }
    }
}

/// Page parameters for a proposals query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalQuery {
    pub limit: u32,
    /// Exclusive pagination cursor: return proposals older than this id.
    pub before_proposal: Option<ProposalId>,
    /// Restrict to these reward statuses; empty means no restriction.
    pub include_reward_status: Vec<RewardStatus>,
}

impl Default for ProposalQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PROPOSAL_PAGE_LIMIT,
            before_proposal: None,
            include_reward_status: Vec::new(),
        }
    }
}

impl ProposalQuery {
    /// The page shape used when re-reading after a vote: only proposals
    /// still accepting votes matter for actionable projections.
    #[must_use]
    pub fn accepting_votes(limit: u32) -> Self {
        Self {
            limit,
            before_proposal: None,
            include_reward_status: vec![RewardStatus::AcceptVotes],
        }
    }
}

/// A read request for one data domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainRequest {
    Proposals(ProposalQuery),
    Units,
}

impl DomainRequest {
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            DomainRequest::Proposals(_) => EntityKind::Proposal,
            DomainRequest::Units => EntityKind::Unit,
        }
    }
}

/// A read response for one data domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainResponse {
    Proposals(Vec<Proposal>),
    Units(Vec<Unit>),
}

impl DomainResponse {
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            DomainResponse::Proposals(_) => EntityKind::Proposal,
            DomainResponse::Units(_) => EntityKind::Unit,
        }
    }

    /// Flatten into store entities.
    #[must_use]
    pub fn into_entities(self) -> Vec<Entity> {
        match self {
            DomainResponse::Proposals(proposals) => {
                proposals.into_iter().map(Entity::Proposal).collect()
            }
            DomainResponse::Units(units) => units.into_iter().map(Entity::Unit).collect(),
        }
    }
}

/// Opaque caller identity, captured once per top-level operation and reused
/// for every remote call in that batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(String);

impl Identity {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyIdError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Identity {
    type Error = EmptyIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.0
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proposal::{ProposalStatus, Tally};
    use std::collections::BTreeMap;

    #[test]
    fn entity_id_tracks_kind() {
        let unit_id = EntityId::Unit(UnitId::new("01").unwrap());
        assert_eq!(unit_id.kind(), EntityKind::Unit);

        let proposal_id = EntityId::Proposal(ProposalId::new(3));
        assert_eq!(proposal_id.kind(), EntityKind::Proposal);
    }

    #[test]
    fn response_flattens_to_entities() {
        let proposal = Proposal {
            id: ProposalId::new(9),
            action: 0,
            ballots: BTreeMap::new(),
            tally: Tally::default(),
            status: ProposalStatus::Open,
            reward_status: RewardStatus::AcceptVotes,
            created_timestamp_seconds: 0,
        };
        let entities = DomainResponse::Proposals(vec![proposal.clone()]).into_entities();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].id(), EntityId::Proposal(proposal.id));
    }

    #[test]
    fn accepting_votes_query_restricts_reward_status() {
        let query = ProposalQuery::accepting_votes(20);
        assert_eq!(query.include_reward_status, vec![RewardStatus::AcceptVotes]);
        assert_eq!(query.before_proposal, None);
    }
}
