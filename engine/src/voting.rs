//! Multi-unit vote registration.
//!
//! One `cast_vote` call fans a certified `register_vote` mutation out to
//! every eligible unit of the caller, concurrently, and reconciles the
//! results: each success is patched into the proposal's ballot set and
//! written through the store immediately, each failure is collected without
//! aborting the sibling calls. There are no retries; the transport's own
//! deadline is the only give-up point.
//!
//! Eligibility is decided by the proposal's ballot set alone: a unit votes
//! here only if it holds a ballot that is still
//! [`Vote::Unspecified`](synod_types::Vote). Ineligible units are skipped
//! silently, and a call with zero eligible units is a successful no-op.

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use synod_connectors::{ConnectorError, IdentityProvider, SystemConnector, SystemDirectory};
use synod_types::{Entity, Freshness, GovernanceSystemId, Identity, Proposal, ProposalId, UnitId, Vote};
use thiserror::Error;

use crate::store::EntityStore;

/// One vote cast across all of the caller's units on one proposal.
#[derive(Debug, Clone)]
pub struct VoteRequest {
    pub system: GovernanceSystemId,
    /// The proposal being voted on, with its current ballot set. Eligibility
    /// is read from here, not refetched.
    pub proposal: Proposal,
    /// Candidate units; those without an uncast ballot are skipped.
    pub units: Vec<UnitId>,
    pub vote: Vote,
}

/// A unit whose `register_vote` call failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: UnitId,
    pub reason: ConnectorError,
}

/// Settled outcome of one [`VoteRequest`].
///
/// `eligible`, `succeeded`, and `failures` are all ordered by the position
/// of the unit in the request, regardless of the order the calls completed
/// in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteReport {
    pub proposal: ProposalId,
    pub eligible: Vec<UnitId>,
    pub succeeded: Vec<UnitId>,
    pub failures: Vec<UnitFailure>,
}

impl VoteReport {
    /// True when no unit was eligible and no call was issued.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.eligible.is_empty()
    }

    /// One line aggregating every failure, `None` when all calls succeeded.
    ///
    /// Failures are numbered by their 1-based position among the failures,
    /// zero-padded to two digits: `"01: reason, 02: reason"`.
    #[must_use]
    pub fn failure_summary(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .failures
            .iter()
            .enumerate()
            .map(|(index, failure)| format!("{:02}: {}", index + 1, failure.reason))
            .collect();
        Some(parts.join(", "))
    }
}

#[derive(Debug, Error)]
pub enum VoteError {
    #[error("unknown governance system: {0}")]
    UnknownSystem(GovernanceSystemId),
    /// Every eligible unit failed. Partial success is reported as `Ok`.
    #[error("vote registration failed for all {} eligible units", .0.failures.len())]
    AllUnitsFailed(VoteReport),
}

pub(crate) async fn cast_vote<F>(
    store: &EntityStore,
    directory: &SystemDirectory,
    identity_provider: &dyn IdentityProvider,
    request: VoteRequest,
    mut on_applied: F,
) -> Result<VoteReport, VoteError>
where
    F: FnMut(&Proposal),
{
    let VoteRequest {
        system,
        proposal,
        units,
        vote,
    } = request;
    let Some(connector) = directory.lookup(&system) else {
        return Err(VoteError::UnknownSystem(system));
    };

    let eligible: Vec<UnitId> = units
        .iter()
        .filter(|unit| proposal.accepts_vote_from(unit))
        .cloned()
        .collect();
    let proposal_id = proposal.id;
    tracing::debug!(
        system = %system,
        proposal = %proposal_id,
        candidates = units.len(),
        eligible = eligible.len(),
        "Casting vote"
    );
    if eligible.is_empty() {
        return Ok(VoteReport {
            proposal: proposal_id,
            eligible,
            succeeded: Vec::new(),
            failures: Vec::new(),
        });
    }

    let identity = identity_provider.current_identity();
    let mut calls = FuturesUnordered::new();
    for (position, unit) in eligible.iter().enumerate() {
        calls.push(register_unit_vote(
            &connector,
            &identity,
            position,
            unit,
            proposal_id,
            vote,
        ));
    }

    let mut working = proposal;
    let mut succeeded: Vec<(usize, UnitId)> = Vec::new();
    let mut failed: Vec<(usize, UnitFailure)> = Vec::new();
    while let Some((position, result)) = calls.next().await {
        let unit = &eligible[position];
        match result {
            Ok(()) => {
                working.record_vote(unit, vote);
                store.put(
                    &system,
                    Entity::Proposal(working.clone()),
                    Freshness::Certified,
                );
                on_applied(&working);
                succeeded.push((position, unit.clone()));
            }
            Err(reason) => {
                tracing::warn!(
                    system = %system,
                    proposal = %proposal_id,
                    unit = %unit,
                    error = %reason,
                    "Vote registration failed for unit"
                );
                failed.push((position, UnitFailure {
                    unit: unit.clone(),
                    reason,
                }));
            }
        }
    }
    drop(calls);

    succeeded.sort_by_key(|(position, _)| *position);
    failed.sort_by_key(|(position, _)| *position);
    let report = VoteReport {
        proposal: proposal_id,
        eligible,
        succeeded: succeeded.into_iter().map(|(_, unit)| unit).collect(),
        failures: failed.into_iter().map(|(_, failure)| failure).collect(),
    };

    if report.succeeded.is_empty() {
        return Err(VoteError::AllUnitsFailed(report));
    }
    Ok(report)
}

async fn register_unit_vote(
    connector: &SystemConnector,
    identity: &Identity,
    position: usize,
    unit: &UnitId,
    proposal: ProposalId,
    vote: Vote,
) -> (usize, Result<(), ConnectorError>) {
    (
        position,
        connector.submit_vote(identity, unit, proposal, vote).await,
    )
}
