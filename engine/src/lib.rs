//! Reconciliation engine for multi-ledger governance state.
//!
//! This crate layers a consistency protocol over the collaborator
//! interfaces of `synod-connectors`:
//!
//! - [`EntityStore`] - the fingerprinted entity cache, the only shared
//!   mutable state; writes are ordered by a store-wide [`WriteSeq`] and a
//!   certified value is never downgraded by an uncertified one.
//! - [`Engine::sync`] - the dual-read coordinator: per-system concurrent
//!   reads of one data domain at one or both freshness tiers, reconciled
//!   into the store in arrival order.
//! - [`Engine::cast_vote`] - the mutation orchestrator: one certified vote
//!   call per eligible unit, optimistic ballot patches per success, partial
//!   failures aggregated, and a deduplicated background refresh toward
//!   ground truth.
//! - [`ActionableTracker`] - the pure projection of per-system actionable
//!   counts, recomputed from the store on every relevant notification.
//!
//! Everything runs on one logical thread of control; the store needs
//! ordering discipline, not locking, and all async work is safe on a
//! current-thread runtime.
//!
//! [`WriteSeq`]: synod_types::WriteSeq

use std::sync::Arc;

use synod_connectors::{IdentityProvider, SystemDirectory};
use synod_types::{DomainRequest, EntityKind, GovernanceSystemId, Proposal};

mod config;
mod projection;
mod refresh;
mod store;
mod sync;
mod voting;

pub use config::EngineConfig;
pub use projection::{ActionableCounts, ActionablePredicate, ActionableTracker};
pub use store::{
    EntityRecord, EntityStore, Fingerprint, PutOutcome, StoreEvent, StoreObserver, WriteFence,
};
pub use sync::{SyncError, SyncReport, SyncStrategy, SystemSyncOutcome};
pub use voting::{UnitFailure, VoteError, VoteReport, VoteRequest};

use refresh::{RefreshKey, RefreshScheduler};

/// The engine facade: owns the store, the refresh worker, and the
/// actionable projection, and carries the directory and identity provider
/// into every operation.
///
/// Construction spawns the refresh worker, so it must happen within a tokio
/// runtime. The engine is cheap to share behind an `Arc`; all methods take
/// `&self`.
pub struct Engine {
    store: Arc<EntityStore>,
    directory: Arc<SystemDirectory>,
    identity_provider: Arc<dyn IdentityProvider>,
    config: EngineConfig,
    refresh: RefreshScheduler,
    actionable: Arc<ActionableTracker>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("directory", &self.directory)
            .field("config", &self.config)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Wire an engine over the given collaborators.
    ///
    /// The actionable predicate starts out rejecting everything; call
    /// [`set_actionable_predicate`](Self::set_actionable_predicate) once the
    /// caller's units are known.
    #[must_use]
    pub fn new(
        directory: Arc<SystemDirectory>,
        identity_provider: Arc<dyn IdentityProvider>,
        config: EngineConfig,
    ) -> Self {
        let store = Arc::new(EntityStore::new());
        let actionable = ActionableTracker::subscribe(store.clone(), |_| false);
        let refresh = RefreshScheduler::spawn(
            store.clone(),
            directory.clone(),
            identity_provider.clone(),
            config.clone(),
        );
        Self {
            store,
            directory,
            identity_provider,
            config,
            refresh,
            actionable,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    #[must_use]
    pub fn directory(&self) -> &Arc<SystemDirectory> {
        &self.directory
    }

    #[must_use]
    pub fn actionable(&self) -> &ActionableTracker {
        &self.actionable
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replace the actionable test, e.g. after the caller's unit set was
    /// (re)loaded. Recounts every system synchronously.
    pub fn set_actionable_predicate(
        &self,
        predicate: impl Fn(&Proposal) -> bool + Send + Sync + 'static,
    ) {
        self.actionable.set_predicate(predicate);
    }

    /// Synchronize one data domain across `systems`.
    ///
    /// Systems fail independently; the result is an error only when the
    /// configured deadline elapsed or every targeted system failed.
    pub async fn sync(
        &self,
        request: &DomainRequest,
        systems: &[GovernanceSystemId],
        strategy: SyncStrategy,
    ) -> Result<SyncReport, SyncError> {
        sync::sync_domain(
            &self.store,
            &self.directory,
            self.identity_provider.as_ref(),
            request,
            systems,
            strategy,
            self.config.sync_timeout,
        )
        .await
    }

    /// Synchronize one data domain across every system the directory knows.
    pub async fn sync_all(
        &self,
        request: &DomainRequest,
        strategy: SyncStrategy,
    ) -> Result<SyncReport, SyncError> {
        let systems = self.directory.systems();
        self.sync(request, &systems, strategy).await
    }

    /// Cast a vote across the caller's units; see [`VoteRequest`].
    ///
    /// `on_applied` fires once per successful unit with the optimistically
    /// patched proposal. When at least one unit succeeded, a background
    /// refresh of the affected system's actionable proposals is scheduled -
    /// for the primary system, also of every linked system from the config.
    pub async fn cast_vote<F>(
        &self,
        request: VoteRequest,
        on_applied: F,
    ) -> Result<VoteReport, VoteError>
    where
        F: FnMut(&Proposal),
    {
        let system = request.system.clone();
        let report = voting::cast_vote(
            &self.store,
            &self.directory,
            self.identity_provider.as_ref(),
            request,
            on_applied,
        )
        .await?;

        if !report.succeeded.is_empty() {
            self.schedule_refresh(&system);
            if system.is_primary() {
                for linked in &self.config.linked_actionable_systems {
                    self.schedule_refresh(linked);
                }
            }
        }
        Ok(report)
    }

    /// Drop a secondary system: forget its connector and clear its entities.
    /// Returns whether the directory knew the system.
    pub fn remove_system(&self, system: &GovernanceSystemId) -> bool {
        let removed = self.directory.remove_secondary(system);
        self.store.reset(system);
        removed
    }

    /// Clear every system's entities, e.g. on logout. Connectors stay
    /// registered; the next sync repopulates under the new identity.
    pub fn reset_all(&self) {
        for system in self.store.systems() {
            self.store.reset(&system);
        }
    }

    /// Observes the number of completed background refreshes. Lets hosts
    /// await post-vote convergence instead of polling the store.
    #[must_use]
    pub fn completed_refreshes(&self) -> tokio::sync::watch::Receiver<u64> {
        self.refresh.completed_runs()
    }

    fn schedule_refresh(&self, system: &GovernanceSystemId) {
        let scheduled = self.refresh.schedule(RefreshKey {
            kind: EntityKind::Proposal,
            system: system.clone(),
        });
        tracing::debug!(system = %system, scheduled, "Post-vote refresh requested");
    }
}
