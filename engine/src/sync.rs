//! Dual-read synchronization across governance systems.
//!
//! One sync targets one data domain (proposals or units) on a set of systems.
//! Each system is read independently and concurrently; depending on the
//! strategy, either the certified tier alone or both tiers at once. Responses
//! are applied to the store through a [`WriteFence`](crate::store::WriteFence)
//! captured before the reads were issued, so whatever order they arrive in,
//! the store converges on the newest certified data.
//!
//! Failure handling is asymmetric by design:
//!
//! * an uncertified failure is invisible to the caller as long as the
//!   certified read succeeds;
//! * a certified failure marks the system's retained records of that domain
//!   as needing refresh and reports the system as failed;
//! * only the failure of every targeted system is an error.

use std::collections::BTreeMap;
use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use serde::{Deserialize, Serialize};
use synod_connectors::{ConnectorError, IdentityProvider, SystemConnector, SystemDirectory};
use synod_types::{DomainRequest, DomainResponse, Freshness, GovernanceSystemId, Identity};
use thiserror::Error;

use crate::store::{EntityStore, PutOutcome, WriteFence};

/// How eagerly a sync trades trust for latency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncStrategy {
    /// Read only the certified tier. Used when data must be trustworthy
    /// before it is shown or acted on.
    CertifiedOnly,
    /// Read both tiers concurrently. The uncertified response usually lands
    /// first and is applied for responsiveness; the certified response
    /// replaces it when it arrives.
    #[default]
    PreferFast,
}

impl SyncStrategy {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStrategy::CertifiedOnly => "certified-only",
            SyncStrategy::PreferFast => "prefer-fast",
        }
    }
}

/// Per-system result of one sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemSyncOutcome {
    /// The certified read succeeded and its data was offered to the store.
    Applied,
    /// The certified read failed; retained data was flagged as needing
    /// refresh.
    Failed(ConnectorError),
}

impl SystemSyncOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, SystemSyncOutcome::Applied)
    }
}

/// Outcome of a sync across all targeted systems.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    outcomes: BTreeMap<GovernanceSystemId, SystemSyncOutcome>,
}

impl SyncReport {
    #[must_use]
    pub fn outcome(&self, system: &GovernanceSystemId) -> Option<&SystemSyncOutcome> {
        self.outcomes.get(system)
    }

    #[must_use]
    pub fn is_applied(&self, system: &GovernanceSystemId) -> bool {
        self.outcomes
            .get(system)
            .is_some_and(SystemSyncOutcome::is_applied)
    }

    /// Systems whose certified read failed, with the failure.
    pub fn failures(&self) -> impl Iterator<Item = (&GovernanceSystemId, &ConnectorError)> {
        self.outcomes.iter().filter_map(|(system, outcome)| match outcome {
            SystemSyncOutcome::Failed(error) => Some((system, error)),
            SystemSyncOutcome::Applied => None,
        })
    }

    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty()
            && self
                .outcomes
                .values()
                .all(|outcome| !outcome.is_applied())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("synchronization timed out after {0:?}")]
    Timeout(Duration),
    #[error("all {} targeted governance systems failed to synchronize", .0.len())]
    AllSystemsFailed(SyncReport),
}

/// Read one domain on every system in `systems` and reconcile the responses
/// into the store.
///
/// The caller identity is captured once and reused for every remote call in
/// the batch. An empty system list is a successful no-op.
pub(crate) async fn sync_domain(
    store: &EntityStore,
    directory: &SystemDirectory,
    identity_provider: &dyn IdentityProvider,
    request: &DomainRequest,
    systems: &[GovernanceSystemId],
    strategy: SyncStrategy,
    timeout: Option<Duration>,
) -> Result<SyncReport, SyncError> {
    if systems.is_empty() {
        return Ok(SyncReport::default());
    }
    let identity = identity_provider.current_identity();
    tracing::debug!(
        domain = ?request.kind(),
        systems = systems.len(),
        strategy = strategy.as_str(),
        "Synchronizing domain"
    );

    let run = async {
        let mut fan_out = FuturesUnordered::new();
        for system in systems {
            fan_out.push(sync_system(
                store, directory, &identity, request, system, strategy,
            ));
        }
        let mut report = SyncReport::default();
        while let Some((system, outcome)) = fan_out.next().await {
            report.outcomes.insert(system, outcome);
        }
        report
    };

    let report = match timeout {
        Some(limit) => tokio::time::timeout(limit, run)
            .await
            .map_err(|_| SyncError::Timeout(limit))?,
        None => run.await,
    };

    if report.all_failed() {
        return Err(SyncError::AllSystemsFailed(report));
    }
    Ok(report)
}

/// Read both tiers (or just the certified one) for a single system, applying
/// each response through the fence as it arrives.
async fn sync_system(
    store: &EntityStore,
    directory: &SystemDirectory,
    identity: &Identity,
    request: &DomainRequest,
    system: &GovernanceSystemId,
    strategy: SyncStrategy,
) -> (GovernanceSystemId, SystemSyncOutcome) {
    let Some(connector) = directory.lookup(system) else {
        tracing::warn!(system = %system, "No connector registered for sync target");
        return (
            system.clone(),
            SystemSyncOutcome::Failed(ConnectorError::UnknownSystem(system.clone())),
        );
    };

    let fence = store.fence(system);
    let mut tiers = FuturesUnordered::new();
    tiers.push(tier_read(&connector, identity, request, Freshness::Certified));
    if strategy == SyncStrategy::PreferFast {
        tiers.push(tier_read(
            &connector,
            identity,
            request,
            Freshness::Uncertified,
        ));
    }

    let mut certified_failure = None;
    while let Some((freshness, result)) = tiers.next().await {
        match result {
            Ok(response) => {
                let (stored, discarded) = apply_response(store, response, freshness, &fence);
                tracing::debug!(
                    system = %system,
                    freshness = freshness.as_str(),
                    stored,
                    discarded,
                    "Applied sync response"
                );
            }
            Err(error) if freshness.is_certified() => certified_failure = Some(error),
            Err(error) => {
                tracing::debug!(
                    system = %system,
                    error = %error,
                    "Uncertified read failed; certified read decides the outcome"
                );
            }
        }
    }

    match certified_failure {
        Some(error) => {
            let marked = store.mark_domain_stale(system, request.kind());
            tracing::warn!(
                system = %system,
                error = %error,
                marked,
                "Certified read failed; retained records flagged for refresh"
            );
            (system.clone(), SystemSyncOutcome::Failed(error))
        }
        None => (system.clone(), SystemSyncOutcome::Applied),
    }
}

async fn tier_read(
    connector: &SystemConnector,
    identity: &Identity,
    request: &DomainRequest,
    freshness: Freshness,
) -> (Freshness, Result<DomainResponse, ConnectorError>) {
    (freshness, connector.query(identity, request, freshness).await)
}

fn apply_response(
    store: &EntityStore,
    response: DomainResponse,
    freshness: Freshness,
    fence: &WriteFence,
) -> (usize, usize) {
    let mut stored = 0;
    let mut discarded = 0;
    for entity in response.into_entities() {
        match store.put_fenced(fence, entity, freshness) {
            PutOutcome::Stored(_) => stored += 1,
            PutOutcome::Discarded => discarded += 1,
        }
    }
    (stored, discarded)
}
