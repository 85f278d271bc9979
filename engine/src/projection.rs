//! Actionable-proposal projection.
//!
//! A pure derived view over the store: for every system holding data, the
//! count of proposals matching an externally supplied "actionable"
//! predicate. The counts are never stored as independent state; they are
//! recomputed from the store's current contents on every relevant
//! notification, so they cannot drift from the source table.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use synod_types::{EntityKind, GovernanceSystemId, Proposal};
use tokio::sync::watch;

use crate::store::{EntityStore, StoreEvent, StoreObserver};

/// The actionable test applied to each proposal. Must be pure; it is called
/// synchronously on the mutating thread.
pub type ActionablePredicate = dyn Fn(&Proposal) -> bool + Send + Sync;

/// Per-system actionable-proposal counts.
pub type ActionableCounts = BTreeMap<GovernanceSystemId, usize>;

/// Observes the store and keeps per-system actionable counts current.
///
/// Subscribe with [`EntityStore::subscribe`]; counts update synchronously on
/// every proposal write, stale mark, and reset. Consumers read a snapshot
/// via [`counts`](Self::counts) or await changes via
/// [`watch`](Self::watch). The tracker never issues remote calls and never
/// writes to the store.
pub struct ActionableTracker {
    store: Arc<EntityStore>,
    predicate: RwLock<Box<ActionablePredicate>>,
    counts: watch::Sender<ActionableCounts>,
}

impl ActionableTracker {
    /// Build a tracker and register it with the store.
    #[must_use]
    pub fn subscribe(
        store: Arc<EntityStore>,
        predicate: impl Fn(&Proposal) -> bool + Send + Sync + 'static,
    ) -> Arc<Self> {
        let tracker = Arc::new(Self {
            store: store.clone(),
            predicate: RwLock::new(Box::new(predicate)),
            counts: watch::Sender::new(ActionableCounts::new()),
        });
        tracker.recompute_all();
        store.subscribe(tracker.clone());
        tracker
    }

    /// Replace the predicate and recompute every system's count, e.g. after
    /// the caller's unit set changed.
    pub fn set_predicate(&self, predicate: impl Fn(&Proposal) -> bool + Send + Sync + 'static) {
        *self
            .predicate
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Box::new(predicate);
        self.recompute_all();
    }

    /// Current counts, one entry per system holding any data.
    #[must_use]
    pub fn counts(&self) -> ActionableCounts {
        self.counts.borrow().clone()
    }

    /// Count for one system; absent systems count zero.
    #[must_use]
    pub fn count_for(&self, system: &GovernanceSystemId) -> usize {
        self.counts.borrow().get(system).copied().unwrap_or(0)
    }

    /// A receiver that observes every recount.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ActionableCounts> {
        self.counts.subscribe()
    }

    fn recompute_all(&self) {
        let systems = self.store.systems();
        let predicate = self
            .predicate
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut next = ActionableCounts::new();
        for system in systems {
            let count = self
                .store
                .proposals(&system)
                .iter()
                .filter(|proposal| predicate(proposal))
                .count();
            next.insert(system, count);
        }
        drop(predicate);
        self.counts.send_replace(next);
    }

    fn recompute_system(&self, system: &GovernanceSystemId) {
        let count = {
            let predicate = self
                .predicate
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            self.store
                .proposals(system)
                .iter()
                .filter(|proposal| predicate(proposal))
                .count()
        };
        self.counts.send_modify(|counts| {
            counts.insert(system.clone(), count);
        });
    }
}

impl StoreObserver for ActionableTracker {
    fn on_event(&self, event: &StoreEvent) {
        match event {
            StoreEvent::Applied { system, id, .. } if id.kind() == EntityKind::Proposal => {
                self.recompute_system(system);
            }
            StoreEvent::StaleMarked { system, kind } if *kind == EntityKind::Proposal => {
                self.recompute_system(system);
            }
            StoreEvent::Reset { system } => {
                self.counts.send_modify(|counts| {
                    counts.remove(system);
                });
            }
            StoreEvent::Applied { .. } | StoreEvent::StaleMarked { .. } => {}
        }
    }
}

impl std::fmt::Debug for ActionableTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionableTracker")
            .field("counts", &*self.counts.borrow())
            .finish_non_exhaustive()
    }
}
