//! Post-vote background refresh.
//!
//! After a vote lands, the affected system's actionable proposals are
//! re-read in the background so the optimistic ballot patches converge to
//! the ledger's view. Refreshes are fire-and-forget: a failed run is logged
//! and dropped, never surfaced to the voter.
//!
//! The queue is deduplicated by `(domain, system)`: a key scheduled while a
//! refresh for it is pending (enqueued or running) is dropped, and the
//! eventual run reads live state, so nothing is lost by the dedup.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};

use synod_connectors::{IdentityProvider, SystemDirectory};
use synod_types::{DomainRequest, EntityKind, GovernanceSystemId, ProposalQuery};
use tokio::sync::{mpsc, watch};

use crate::config::EngineConfig;
use crate::store::EntityStore;
use crate::sync::sync_domain;

/// One pending refresh: a data domain on one system.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) struct RefreshKey {
    pub kind: EntityKind,
    pub system: GovernanceSystemId,
}

/// Owns the refresh worker task and the dedup set.
///
/// Dropping the scheduler closes the queue; the worker drains what was
/// already accepted and exits.
pub(crate) struct RefreshScheduler {
    pending: Arc<Mutex<BTreeSet<RefreshKey>>>,
    queue: mpsc::UnboundedSender<RefreshKey>,
    completed: watch::Receiver<u64>,
}

impl RefreshScheduler {
    /// Spawn the worker. Must be called within a tokio runtime.
    pub(crate) fn spawn(
        store: Arc<EntityStore>,
        directory: Arc<SystemDirectory>,
        identity_provider: Arc<dyn IdentityProvider>,
        config: EngineConfig,
    ) -> Self {
        let pending: Arc<Mutex<BTreeSet<RefreshKey>>> = Arc::default();
        let (queue, mut receiver) = mpsc::unbounded_channel::<RefreshKey>();
        let (completed_tx, completed) = watch::channel(0_u64);

        let worker_pending = pending.clone();
        tokio::spawn(async move {
            while let Some(key) = receiver.recv().await {
                run_refresh(&store, &directory, identity_provider.as_ref(), &config, &key).await;
                worker_pending
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&key);
                completed_tx.send_modify(|count| *count += 1);
            }
        });

        Self {
            pending,
            queue,
            completed,
        }
    }

    /// Enqueue a refresh unless one is already pending for the same key.
    /// Returns whether the key was accepted.
    pub(crate) fn schedule(&self, key: RefreshKey) -> bool {
        let accepted = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone());
        if !accepted {
            tracing::debug!(system = %key.system, kind = ?key.kind, "Refresh already pending");
            return false;
        }
        // Send can only fail after the worker exited, i.e. at shutdown.
        if self.queue.send(key.clone()).is_err() {
            self.pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&key);
            return false;
        }
        true
    }

    /// Observes the number of completed runs. Lets hosts and tests await
    /// convergence instead of polling the store.
    pub(crate) fn completed_runs(&self) -> watch::Receiver<u64> {
        self.completed.clone()
    }
}

impl std::fmt::Debug for RefreshScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("RefreshScheduler")
            .field("pending", &pending)
            .finish_non_exhaustive()
    }
}

/// One refresh run. The re-read is restricted to proposals still accepting
/// votes; settled proposals no longer feed actionable projections. The
/// refresh is authoritative: its certified responses overwrite optimistic
/// ballot patches.
async fn run_refresh(
    store: &EntityStore,
    directory: &SystemDirectory,
    identity_provider: &dyn IdentityProvider,
    config: &EngineConfig,
    key: &RefreshKey,
) {
    let request = match key.kind {
        EntityKind::Proposal => DomainRequest::Proposals(ProposalQuery::accepting_votes(
            config.refresh_page_limit,
        )),
        EntityKind::Unit => DomainRequest::Units,
    };
    let outcome = sync_domain(
        store,
        directory,
        identity_provider,
        &request,
        std::slice::from_ref(&key.system),
        config.refresh_strategy,
        config.sync_timeout,
    )
    .await;
    match outcome {
        Ok(_) => {
            tracing::debug!(system = %key.system, kind = ?key.kind, "Background refresh applied");
        }
        Err(error) => {
            tracing::warn!(
                system = %key.system,
                kind = ?key.kind,
                error = %error,
                "Background refresh failed; will converge on the next sync"
            );
        }
    }
}
