//! Collaborator traits at the remote-call boundary.
//!
//! These are the black boxes the reconciliation core is layered above. Wire
//! encoding, address resolution and authentication all live behind them.

use async_trait::async_trait;

use synod_types::{
    GovernanceSystemId, Identity, ProposalId, ProposalQuery, UnitId, Vote,
};

use crate::ConnectorError;

/// Remote interface of the primary governance system.
///
/// The primary system is a fixed, well-known ledger; its calls carry no
/// system id. The `certified` flag selects the read tier: `false` is served
/// by a single untrusted replica, `true` is cryptographically verified.
#[async_trait]
pub trait PrimaryGovernanceApi: Send + Sync {
    async fn query_proposals(
        &self,
        identity: &Identity,
        query: &ProposalQuery,
        certified: bool,
    ) -> Result<Vec<synod_types::Proposal>, ConnectorError>;

    async fn query_units(
        &self,
        identity: &Identity,
        certified: bool,
    ) -> Result<Vec<synod_types::Unit>, ConnectorError>;

    /// Cast one unit's vote. Always a certified call.
    async fn register_vote(
        &self,
        identity: &Identity,
        unit: &UnitId,
        proposal: ProposalId,
        vote: Vote,
    ) -> Result<(), ConnectorError>;
}

/// Remote interface of a secondary governance system.
///
/// Secondary systems are discovered at runtime, so every call addresses its
/// target by system id.
#[async_trait]
pub trait SecondaryGovernanceApi: Send + Sync {
    async fn query_proposals(
        &self,
        identity: &Identity,
        system: &GovernanceSystemId,
        query: &ProposalQuery,
        certified: bool,
    ) -> Result<Vec<synod_types::Proposal>, ConnectorError>;

    async fn query_units(
        &self,
        identity: &Identity,
        system: &GovernanceSystemId,
        certified: bool,
    ) -> Result<Vec<synod_types::Unit>, ConnectorError>;

    /// Cast one unit's vote. Always a certified call.
    async fn register_vote(
        &self,
        identity: &Identity,
        system: &GovernanceSystemId,
        unit: &UnitId,
        proposal: ProposalId,
        vote: Vote,
    ) -> Result<(), ConnectorError>;
}

/// Source of the caller identity.
///
/// Consulted exactly once per top-level operation (a read batch or a vote
/// batch); every remote call in that batch reuses the identity captured at
/// batch start, so a mid-flight identity change never splits a batch across
/// two identities.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Identity;
}
