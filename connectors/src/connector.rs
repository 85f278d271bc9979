//! Uniform capability surface over the two governance-system call shapes.

use std::fmt;
use std::sync::Arc;

use synod_types::{
    DomainRequest, DomainResponse, Freshness, GovernanceSystemId, Identity, ProposalId, UnitId,
    Vote,
};

use crate::api::{PrimaryGovernanceApi, SecondaryGovernanceApi};
use crate::ConnectorError;

/// One governance system's connector: the closed primary/secondary variant
/// pair behind the `{query_uncertified, query_certified, submit_vote}`
/// capability interface.
///
/// Selected once per system id from the [`SystemDirectory`]; holds no state
/// of its own beyond the API handle and (for secondaries) the addressed
/// system id.
///
/// [`SystemDirectory`]: crate::SystemDirectory
#[derive(Clone)]
pub enum SystemConnector {
    Primary(Arc<dyn PrimaryGovernanceApi>),
    Secondary {
        system: GovernanceSystemId,
        api: Arc<dyn SecondaryGovernanceApi>,
    },
}

impl SystemConnector {
    /// The system this connector addresses.
    #[must_use]
    pub fn system(&self) -> GovernanceSystemId {
        match self {
            SystemConnector::Primary(_) => GovernanceSystemId::primary(),
            SystemConnector::Secondary { system, .. } => system.clone(),
        }
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        matches!(self, SystemConnector::Primary(_))
    }

    /// Fast read from a single untrusted replica.
    pub async fn query_uncertified(
        &self,
        identity: &Identity,
        request: &DomainRequest,
    ) -> Result<DomainResponse, ConnectorError> {
        self.query(identity, request, Freshness::Uncertified).await
    }

    /// Authoritative, verifiable read.
    pub async fn query_certified(
        &self,
        identity: &Identity,
        request: &DomainRequest,
    ) -> Result<DomainResponse, ConnectorError> {
        self.query(identity, request, Freshness::Certified).await
    }

    pub async fn query(
        &self,
        identity: &Identity,
        request: &DomainRequest,
        freshness: Freshness,
    ) -> Result<DomainResponse, ConnectorError> {
        let certified = freshness.is_certified();
        match (self, request) {
            (SystemConnector::Primary(api), DomainRequest::Proposals(query)) => api
                .query_proposals(identity, query, certified)
                .await
                .map(DomainResponse::Proposals),
            (SystemConnector::Primary(api), DomainRequest::Units) => api
                .query_units(identity, certified)
                .await
                .map(DomainResponse::Units),
            (SystemConnector::Secondary { system, api }, DomainRequest::Proposals(query)) => api
                .query_proposals(identity, system, query, certified)
                .await
                .map(DomainResponse::Proposals),
            (SystemConnector::Secondary { system, api }, DomainRequest::Units) => api
                .query_units(identity, system, certified)
                .await
                .map(DomainResponse::Units),
        }
    }

    /// Cast one unit's vote on a proposal. Certified; not deduplicated.
    pub async fn submit_vote(
        &self,
        identity: &Identity,
        unit: &UnitId,
        proposal: ProposalId,
        vote: Vote,
    ) -> Result<(), ConnectorError> {
        match self {
            SystemConnector::Primary(api) => {
                api.register_vote(identity, unit, proposal, vote).await
            }
            SystemConnector::Secondary { system, api } => {
                api.register_vote(identity, system, unit, proposal, vote)
                    .await
            }
        }
    }
}

impl fmt::Debug for SystemConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SystemConnector::Primary(_) => f.debug_tuple("Primary").finish(),
            SystemConnector::Secondary { system, .. } => {
                f.debug_struct("Secondary").field("system", system).finish()
            }
        }
    }
}
