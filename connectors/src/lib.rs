//! Governance-system collaborator interfaces and connector dispatch.
//!
//! # Architecture
//!
//! The crate is organized around a connector dispatch pattern:
//!
//! - [`PrimaryGovernanceApi`] / [`SecondaryGovernanceApi`] - the remote-call
//!   boundary, one trait per governance-system kind. The primary system is a
//!   single well-known ledger, so its methods carry no system id; secondary
//!   systems are discovered at runtime and addressed per call.
//! - [`SystemConnector`] - a closed two-variant dispatch that adapts both
//!   call shapes to one capability surface:
//!   [`query_uncertified`](SystemConnector::query_uncertified),
//!   [`query_certified`](SystemConnector::query_certified) and
//!   [`submit_vote`](SystemConnector::submit_vote).
//! - [`SystemDirectory`] - id to connector selection, with runtime
//!   registration and removal of secondary systems.
//! - [`IdentityProvider`] - the caller identity source; consulted once per
//!   top-level operation and passed into every call of that batch.
//!
//! # Freshness tiers
//!
//! Every read is served in one of two tiers: uncertified (fast, from a
//! single untrusted replica) or certified (slower, verifiable). Both query
//! methods are idempotent and side-effect-free and may be called
//! concurrently and repeatedly. Mutations are always certified and are never
//! deduplicated here; callers must not submit the same (proposal, unit) vote
//! twice concurrently.
//!
//! # Error Handling
//!
//! All remote failures surface as [`ConnectorError`]. A timeout is a plain
//! failure like any other; there is no retry in this layer.

mod api;
mod connector;
mod directory;

pub use api::{IdentityProvider, PrimaryGovernanceApi, SecondaryGovernanceApi};
pub use connector::SystemConnector;
pub use directory::{DirectoryError, SystemDirectory};

use thiserror::Error;

use synod_types::GovernanceSystemId;

/// Failure of one remote call against a governance system.
///
/// Carried per system (reads) or per unit (mutations) so that one failing
/// call never aborts its siblings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectorError {
    /// The call did not complete within the transport's deadline. Treated
    /// identically to any other failure; no retry is attempted.
    #[error("remote call timed out")]
    Timeout,
    /// The transport could not deliver the call or the response.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The governance system received the call and rejected it.
    #[error("{0}")]
    Rejected(String),
    /// No connector is registered for the addressed system.
    #[error("unknown governance system: {0}")]
    UnknownSystem(GovernanceSystemId),
}

impl ConnectorError {
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self::Rejected(reason.into())
    }

    #[must_use]
    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport(detail.into())
    }
}
