//! Fingerprinted entity store.
//!
//! The store is the single cache of governance entities, keyed by
//! `(system, entity id)`. Every record carries a fingerprint: the freshness
//! tier it was read at and a store-wide monotonic write sequence. Writes are
//! ordered by that sequence, never by call issue time or arrival time, which
//! is what makes concurrent dual-tier reads safe to apply in any order.
//!
//! Two conflict rules hold for every key:
//!
//! * a certified write always replaces the current value;
//! * an uncertified write is discarded when a certified value is present.
//!
//! Reads issued against a [`WriteFence`] additionally discard their responses
//! when the system was reset or the key was overwritten after the fence was
//! captured, so late or reordered responses cannot resurrect stale state.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use synod_types::{
    Entity, EntityId, EntityKind, Freshness, GovernanceSystemId, Proposal, Unit, WriteSeq,
};

/// Freshness tier and write sequence of a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub freshness: Freshness,
    pub seq: WriteSeq,
}

/// A stored entity together with its reconciliation metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    pub entity: Entity,
    pub fingerprint: Fingerprint,
    /// Set when an authoritative read for this record's domain failed and the
    /// retained value may no longer match the ledger. Cleared by the next
    /// accepted certified write.
    pub needs_refresh: bool,
}

/// Result of offering a write to the store.
///
/// A discarded write is not an error: it means the store already holds
/// something newer or more trustworthy for the key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    Stored(WriteSeq),
    Discarded,
}

impl PutOutcome {
    #[must_use]
    pub fn is_stored(self) -> bool {
        matches!(self, PutOutcome::Stored(_))
    }
}

/// Snapshot of a system's write frontier, captured before issuing a read.
///
/// The fence remembers the system's reset generation and the store-wide
/// sequence at capture time. Applying a response through the fence discards
/// it when the data it would overwrite is newer than the snapshot, which
/// makes in-flight calls safe to abandon: late results are ignored instead
/// of applied.
#[derive(Debug, Clone)]
pub struct WriteFence {
    system: GovernanceSystemId,
    generation: u64,
    high_water: u64,
}

impl WriteFence {
    #[must_use]
    pub fn system(&self) -> &GovernanceSystemId {
        &self.system
    }
}

/// Change notification delivered to [`StoreObserver`]s after a mutation has
/// fully landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A write was accepted for `id` under `system`.
    Applied {
        system: GovernanceSystemId,
        id: EntityId,
        freshness: Freshness,
        seq: WriteSeq,
    },
    /// All data for `system` was dropped and its reset generation advanced.
    Reset { system: GovernanceSystemId },
    /// Records of `kind` under `system` were flagged as needing a refresh.
    StaleMarked {
        system: GovernanceSystemId,
        kind: EntityKind,
    },
}

/// Implemented by components that derive state from the store, e.g. the
/// actionable-proposal tracker. Observers run on the mutating thread and must
/// not block; they may read the store freely since notification happens after
/// all locks are released.
pub trait StoreObserver: Send + Sync {
    fn on_event(&self, event: &StoreEvent);
}

#[derive(Default)]
struct SystemTable {
    entities: BTreeMap<EntityId, EntityRecord>,
    /// Bumped by every reset. Tables survive resets so that fences captured
    /// before the reset keep failing the generation check afterwards.
    generation: u64,
}

#[derive(Default)]
struct StoreInner {
    systems: HashMap<GovernanceSystemId, SystemTable>,
    last_seq: u64,
}

/// The shared entity cache. See the module docs for the conflict rules.
#[derive(Default)]
pub struct EntityStore {
    inner: RwLock<StoreInner>,
    observers: RwLock<Vec<Arc<dyn StoreObserver>>>,
}

impl EntityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are notified for every accepted write,
    /// reset, and stale-mark, in registration order.
    pub fn subscribe(&self, observer: Arc<dyn StoreObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// Capture a fence for `system` at the current write frontier.
    #[must_use]
    pub fn fence(&self, system: &GovernanceSystemId) -> WriteFence {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let generation = inner
            .systems
            .get(system)
            .map_or(0, |table| table.generation);
        WriteFence {
            system: system.clone(),
            generation,
            high_water: inner.last_seq,
        }
    }

    /// Offer a write outside any fence. Only the freshness conflict rules
    /// apply; certified writes always land.
    pub fn put(
        &self,
        system: &GovernanceSystemId,
        entity: Entity,
        freshness: Freshness,
    ) -> PutOutcome {
        self.apply_write(system, entity, freshness, None)
    }

    /// Offer a write that originated from a read issued under `fence`.
    pub fn put_fenced(
        &self,
        fence: &WriteFence,
        entity: Entity,
        freshness: Freshness,
    ) -> PutOutcome {
        self.apply_write(&fence.system, entity, freshness, Some(fence))
    }

    fn apply_write(
        &self,
        system: &GovernanceSystemId,
        entity: Entity,
        freshness: Freshness,
        fence: Option<&WriteFence>,
    ) -> PutOutcome {
        let id = entity.id();
        let decision: Result<WriteSeq, &'static str> = {
            let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let inner = &mut *guard;
            let table = inner.systems.entry(system.clone()).or_default();

            if fence.is_some_and(|fence| table.generation != fence.generation) {
                Err("system was reset after the read was issued")
            } else {
                match Self::admit(table.entities.get(&id), freshness, fence) {
                    Err(reason) => Err(reason),
                    Ok(()) => {
                        inner.last_seq += 1;
                        let seq = WriteSeq::new(inner.last_seq);
                        let keep_flag = !freshness.is_certified()
                            && table
                                .entities
                                .get(&id)
                                .is_some_and(|record| record.needs_refresh);
                        table.entities.insert(
                            id.clone(),
                            EntityRecord {
                                entity,
                                fingerprint: Fingerprint { freshness, seq },
                                needs_refresh: keep_flag,
                            },
                        );
                        Ok(seq)
                    }
                }
            }
        };
        match decision {
            Ok(seq) => {
                self.notify(&StoreEvent::Applied {
                    system: system.clone(),
                    id,
                    freshness,
                    seq,
                });
                PutOutcome::Stored(seq)
            }
            Err(reason) => {
                tracing::debug!(
                    system = %system,
                    entity = ?id,
                    freshness = freshness.as_str(),
                    reason,
                    "Discarded write"
                );
                PutOutcome::Discarded
            }
        }
    }

    /// Whether a write may replace `existing`.
    ///
    /// Unfenced: certified always, uncertified unless a certified value is
    /// present. Fenced: additionally discard when the key was overwritten
    /// after the fence was captured, except that a certified write may still
    /// replace non-certified data from its own batch.
    fn admit(
        existing: Option<&EntityRecord>,
        freshness: Freshness,
        fence: Option<&WriteFence>,
    ) -> Result<(), &'static str> {
        let Some(existing) = existing else {
            return Ok(());
        };
        let certified_in_place = existing.fingerprint.freshness.is_certified();
        let moved_past_fence =
            fence.is_some_and(|fence| existing.fingerprint.seq.value() > fence.high_water);

        if freshness.is_certified() {
            if certified_in_place && moved_past_fence {
                return Err("newer certified write landed after the read was issued");
            }
            return Ok(());
        }
        if certified_in_place {
            return Err("certified value present");
        }
        if moved_past_fence {
            return Err("newer write landed after the read was issued");
        }
        Ok(())
    }

    #[must_use]
    pub fn get(&self, system: &GovernanceSystemId, id: &EntityId) -> Option<EntityRecord> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .systems
            .get(system)
            .and_then(|table| table.entities.get(id))
            .cloned()
    }

    /// All proposals held for `system`, in ascending proposal-id order.
    #[must_use]
    pub fn proposals(&self, system: &GovernanceSystemId) -> Vec<Proposal> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.systems.get(system).map_or_else(Vec::new, |table| {
            table
                .entities
                .values()
                .filter_map(|record| record.entity.as_proposal().cloned())
                .collect()
        })
    }

    /// All units held for `system`, in ascending unit-id order.
    #[must_use]
    pub fn units(&self, system: &GovernanceSystemId) -> Vec<Unit> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner.systems.get(system).map_or_else(Vec::new, |table| {
            table
                .entities
                .values()
                .filter_map(|record| record.entity.as_unit().cloned())
                .collect()
        })
    }

    /// Systems currently holding any data, sorted by id.
    #[must_use]
    pub fn systems(&self) -> Vec<GovernanceSystemId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<GovernanceSystemId> = inner
            .systems
            .iter()
            .filter(|(_, table)| !table.entities.is_empty())
            .map(|(system, _)| system.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Systems holding at least one record of `kind` flagged as needing a
    /// refresh, sorted by id.
    #[must_use]
    pub fn stale_systems(&self, kind: EntityKind) -> Vec<GovernanceSystemId> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<GovernanceSystemId> = inner
            .systems
            .iter()
            .filter(|(_, table)| {
                table
                    .entities
                    .iter()
                    .any(|(id, record)| id.kind() == kind && record.needs_refresh)
            })
            .map(|(system, _)| system.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Flag all records of `kind` under `system` as needing a refresh.
    /// Returns how many records were flagged.
    pub fn mark_domain_stale(&self, system: &GovernanceSystemId, kind: EntityKind) -> usize {
        let marked = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let mut marked = 0;
            if let Some(table) = inner.systems.get_mut(system) {
                for (id, record) in &mut table.entities {
                    if id.kind() == kind {
                        record.needs_refresh = true;
                        marked += 1;
                    }
                }
            }
            marked
        };
        if marked > 0 {
            self.notify(&StoreEvent::StaleMarked {
                system: system.clone(),
                kind,
            });
        }
        marked
    }

    /// Drop all data for `system` and advance its reset generation, so that
    /// responses from reads issued before the reset are discarded on arrival.
    pub fn reset(&self, system: &GovernanceSystemId) {
        let removed = {
            let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let table = inner.systems.entry(system.clone()).or_default();
            let removed = table.entities.len();
            table.entities.clear();
            table.generation += 1;
            removed
        };
        tracing::debug!(system = %system, removed, "Reset governance system data");
        self.notify(&StoreEvent::Reset {
            system: system.clone(),
        });
    }

    fn notify(&self, event: &StoreEvent) {
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for observer in observers {
            observer.on_event(event);
        }
    }
}

impl fmt::Debug for EntityStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("EntityStore")
            .field("systems", &inner.systems.len())
            .field("last_seq", &inner.last_seq)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use synod_types::{ProposalId, ProposalStatus, RewardStatus, Tally, UnitId, UnitState};

    fn system(id: &str) -> GovernanceSystemId {
        GovernanceSystemId::new(id).unwrap()
    }

    fn proposal(id: u64) -> Entity {
        Entity::Proposal(Proposal {
            id: ProposalId::new(id),
            action: 0,
            ballots: BTreeMap::new(),
            tally: Tally::default(),
            status: ProposalStatus::Open,
            reward_status: RewardStatus::AcceptVotes,
            created_timestamp_seconds: 0,
        })
    }

    fn unit(id: &str) -> Entity {
        Entity::Unit(Unit {
            id: UnitId::new(id).unwrap(),
            stake: 100,
            state: UnitState::Locked,
            dissolve_delay_seconds: 0,
            created_timestamp_seconds: 0,
            permissions: std::collections::BTreeSet::new(),
        })
    }

    #[test]
    fn uncertified_never_downgrades_certified() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");

        assert!(
            store
                .put(&sns, proposal(1), Freshness::Uncertified)
                .is_stored()
        );
        assert!(
            store
                .put(&sns, proposal(1), Freshness::Certified)
                .is_stored()
        );
        assert_eq!(
            store.put(&sns, proposal(1), Freshness::Uncertified),
            PutOutcome::Discarded
        );

        let record = store
            .get(&sns, &EntityId::Proposal(ProposalId::new(1)))
            .unwrap();
        assert_eq!(record.fingerprint.freshness, Freshness::Certified);
        assert_eq!(record.fingerprint.seq, WriteSeq::new(2));
    }

    #[test]
    fn write_seq_is_global_across_systems() {
        let store = EntityStore::new();
        let a = system("sns-a");
        let b = system("sns-b");

        let first = store.put(&a, proposal(1), Freshness::Certified);
        let second = store.put(&b, proposal(1), Freshness::Certified);
        let third = store.put(&a, unit("01"), Freshness::Certified);

        assert_eq!(first, PutOutcome::Stored(WriteSeq::new(1)));
        assert_eq!(second, PutOutcome::Stored(WriteSeq::new(2)));
        assert_eq!(third, PutOutcome::Stored(WriteSeq::new(3)));
    }

    #[test]
    fn fenced_certified_yields_to_newer_certified() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");

        let fence = store.fence(&sns);
        assert!(
            store
                .put(&sns, proposal(1), Freshness::Certified)
                .is_stored()
        );
        assert_eq!(
            store.put_fenced(&fence, proposal(1), Freshness::Certified),
            PutOutcome::Discarded
        );
    }

    #[test]
    fn fenced_certified_lands_over_same_batch_uncertified() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");

        let fence = store.fence(&sns);
        assert!(
            store
                .put_fenced(&fence, proposal(1), Freshness::Uncertified)
                .is_stored()
        );
        assert!(
            store
                .put_fenced(&fence, proposal(1), Freshness::Certified)
                .is_stored()
        );

        let record = store
            .get(&sns, &EntityId::Proposal(ProposalId::new(1)))
            .unwrap();
        assert_eq!(record.fingerprint.freshness, Freshness::Certified);
    }

    #[test]
    fn fenced_uncertified_yields_to_any_newer_write() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");

        let fence = store.fence(&sns);
        assert!(
            store
                .put(&sns, proposal(1), Freshness::Uncertified)
                .is_stored()
        );
        assert_eq!(
            store.put_fenced(&fence, proposal(1), Freshness::Uncertified),
            PutOutcome::Discarded
        );
    }

    #[test]
    fn fenced_writes_discarded_after_reset() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");
        store.put(&sns, proposal(1), Freshness::Certified);

        let fence = store.fence(&sns);
        store.reset(&sns);

        assert_eq!(
            store.put_fenced(&fence, proposal(1), Freshness::Certified),
            PutOutcome::Discarded
        );
        assert_eq!(
            store.put_fenced(&fence, proposal(2), Freshness::Uncertified),
            PutOutcome::Discarded
        );
        assert!(store.get(&sns, &EntityId::Proposal(ProposalId::new(1))).is_none());
    }

    #[test]
    fn reset_survives_for_fences_on_empty_systems() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");

        let fence = store.fence(&sns);
        store.reset(&sns);

        assert_eq!(
            store.put_fenced(&fence, proposal(1), Freshness::Certified),
            PutOutcome::Discarded
        );
    }

    #[test]
    fn stale_flag_set_per_kind_and_cleared_by_certified_write() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");
        store.put(&sns, proposal(1), Freshness::Certified);
        store.put(&sns, unit("01"), Freshness::Certified);

        assert_eq!(store.mark_domain_stale(&sns, EntityKind::Proposal), 1);
        assert_eq!(store.stale_systems(EntityKind::Proposal), vec![sns.clone()]);
        assert!(store.stale_systems(EntityKind::Unit).is_empty());

        store.put(&sns, proposal(1), Freshness::Certified);
        let record = store
            .get(&sns, &EntityId::Proposal(ProposalId::new(1)))
            .unwrap();
        assert!(!record.needs_refresh);
        assert!(store.stale_systems(EntityKind::Proposal).is_empty());
    }

    #[test]
    fn uncertified_overwrite_preserves_stale_flag() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");
        store.put(&sns, proposal(1), Freshness::Uncertified);
        store.mark_domain_stale(&sns, EntityKind::Proposal);

        store.put(&sns, proposal(1), Freshness::Uncertified);
        let record = store
            .get(&sns, &EntityId::Proposal(ProposalId::new(1)))
            .unwrap();
        assert!(record.needs_refresh);
    }

    #[test]
    fn views_are_sorted_and_typed() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");
        store.put(&sns, proposal(9), Freshness::Certified);
        store.put(&sns, proposal(3), Freshness::Certified);
        store.put(&sns, unit("01"), Freshness::Certified);

        let proposals = store.proposals(&sns);
        let ids: Vec<u64> = proposals.iter().map(|p| p.id.value()).collect();
        assert_eq!(ids, vec![3, 9]);
        assert_eq!(store.units(&sns).len(), 1);

        store.put(&system("sns-zeta"), proposal(1), Freshness::Certified);
        store.put(&system("sns-beta"), proposal(1), Freshness::Certified);
        assert_eq!(
            store.systems(),
            vec![system("sns-alpha"), system("sns-beta"), system("sns-zeta")]
        );
    }

    struct RecordingObserver {
        events: Mutex<Vec<StoreEvent>>,
    }

    impl StoreObserver for RecordingObserver {
        fn on_event(&self, event: &StoreEvent) {
            self.events
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(event.clone());
        }
    }

    #[test]
    fn observers_see_applies_and_resets_but_not_discards() {
        let store = EntityStore::new();
        let sns = system("sns-alpha");
        let observer = Arc::new(RecordingObserver {
            events: Mutex::new(Vec::new()),
        });
        store.subscribe(observer.clone());

        store.put(&sns, proposal(1), Freshness::Certified);
        store.put(&sns, proposal(1), Freshness::Uncertified); // discarded
        store.reset(&sns);

        let events = observer
            .events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        assert_eq!(events.len(), 2);
        match &events[0] {
            StoreEvent::Applied { id, freshness, .. } => {
                assert_eq!(*id, EntityId::Proposal(ProposalId::new(1)));
                assert_eq!(*freshness, Freshness::Certified);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert_eq!(events[1], StoreEvent::Reset { system: sns });
    }
}
