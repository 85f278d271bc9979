//! Core domain types for Synod.
//!
//! This crate contains pure domain types with no IO, no async, and minimal
//! dependencies. Everything here can be used from any layer of the
//! application: identifiers, governance records (units, proposals, ballots),
//! read-domain requests and responses, and pure ordering/filter helpers.

mod domain;
mod ids;
mod proposal;
mod unit;
mod views;
mod vote;

pub use domain::{
    DEFAULT_PROPOSAL_PAGE_LIMIT, DomainRequest, DomainResponse, Entity, EntityId, EntityKind,
    Freshness, Identity, ProposalQuery,
};
pub use ids::{EmptyIdError, GovernanceSystemId, PRIMARY_SYSTEM_ID, ProposalId, UnitId, WriteSeq};
pub use proposal::{Ballot, Proposal, ProposalStatus, RewardStatus, Tally};
pub use unit::{Permission, Unit, UnitState};
pub use views::{
    ProposalFilter, actionable_for_units, compare_by_created, compare_by_dissolve_delay,
    compare_by_id, compare_by_stake, filter_proposals, is_actionable, sort_units,
};
pub use vote::Vote;
