//! Id to connector selection.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use synod_types::GovernanceSystemId;

use crate::api::{PrimaryGovernanceApi, SecondaryGovernanceApi};
use crate::connector::SystemConnector;

#[derive(Debug, Error)]
pub enum DirectoryError {
    /// The primary system id is fixed for the process lifetime and cannot be
    /// re-bound to a secondary API.
    #[error("the primary system id is reserved and cannot be registered as a secondary")]
    PrimaryIdReserved,
}

/// Registry of governance-system connectors.
///
/// The primary system is bound at construction and immutable; secondary
/// systems come and go at runtime as they are discovered or removed.
/// Connector selection happens once per system id at lookup time.
pub struct SystemDirectory {
    primary: Arc<dyn PrimaryGovernanceApi>,
    secondaries: RwLock<HashMap<GovernanceSystemId, Arc<dyn SecondaryGovernanceApi>>>,
}

impl SystemDirectory {
    #[must_use]
    pub fn new(primary: Arc<dyn PrimaryGovernanceApi>) -> Self {
        Self {
            primary,
            secondaries: RwLock::new(HashMap::new()),
        }
    }

    /// Register (or re-register) a secondary system's API.
    ///
    /// Re-registration replaces the previous handle; rediscovery after a
    /// reconnect is routine, not an error.
    pub fn register_secondary(
        &self,
        system: GovernanceSystemId,
        api: Arc<dyn SecondaryGovernanceApi>,
    ) -> Result<(), DirectoryError> {
        if system.is_primary() {
            return Err(DirectoryError::PrimaryIdReserved);
        }
        let mut secondaries = self
            .secondaries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let replaced = secondaries.insert(system.clone(), api).is_some();
        tracing::debug!(system = %system, replaced, "Registered secondary governance system");
        Ok(())
    }

    /// Remove a secondary system. Returns `false` when the id is unknown or
    /// names the primary.
    pub fn remove_secondary(&self, system: &GovernanceSystemId) -> bool {
        let mut secondaries = self
            .secondaries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let removed = secondaries.remove(system).is_some();
        if removed {
            tracing::debug!(system = %system, "Removed secondary governance system");
        }
        removed
    }

    /// Select the connector for a system id.
    #[must_use]
    pub fn lookup(&self, system: &GovernanceSystemId) -> Option<SystemConnector> {
        if system.is_primary() {
            return Some(SystemConnector::Primary(self.primary.clone()));
        }
        let secondaries = self
            .secondaries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        secondaries.get(system).map(|api| SystemConnector::Secondary {
            system: system.clone(),
            api: api.clone(),
        })
    }

    /// All currently known system ids: the primary first, then secondaries
    /// in sorted order.
    #[must_use]
    pub fn systems(&self) -> Vec<GovernanceSystemId> {
        let secondaries = self
            .secondaries
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut ids: Vec<GovernanceSystemId> = secondaries.keys().cloned().collect();
        ids.sort();
        ids.insert(0, GovernanceSystemId::primary());
        ids
    }
}

impl std::fmt::Debug for SystemDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemDirectory")
            .field("systems", &self.systems())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use synod_types::{Identity, ProposalId, ProposalQuery, UnitId, Vote};

    use crate::ConnectorError;

    struct NullPrimary;

    #[async_trait]
    impl PrimaryGovernanceApi for NullPrimary {
        async fn query_proposals(
            &self,
            _identity: &Identity,
            _query: &ProposalQuery,
            _certified: bool,
        ) -> Result<Vec<synod_types::Proposal>, ConnectorError> {
            Ok(Vec::new())
        }

        async fn query_units(
            &self,
            _identity: &Identity,
            _certified: bool,
        ) -> Result<Vec<synod_types::Unit>, ConnectorError> {
            Ok(Vec::new())
        }

        async fn register_vote(
            &self,
            _identity: &Identity,
            _unit: &UnitId,
            _proposal: ProposalId,
            _vote: Vote,
        ) -> Result<(), ConnectorError> {
            Ok(())
        }
    }

    struct NullSecondary;

    #[async_trait]
    impl SecondaryGovernanceApi for NullSecondary {
        async fn query_proposals(
            &self,
            _identity: &Identity,
            _system: &GovernanceSystemId,
            _query: &ProposalQuery,
            _certified: bool,
        ) -> Result<Vec<synod_types::Proposal>, ConnectorError> {
            Ok(Vec::new())
        }

        async fn query_units(
            &self,
            _identity: &Identity,
            _system: &GovernanceSystemId,
            _certified: bool,
        ) -> Result<Vec<synod_types::Unit>, ConnectorError> {
            Ok(Vec::new())
        }

        async fn register_vote(
            &self,
            _identity: &Identity,
            _system: &GovernanceSystemId,
            _unit: &UnitId,
            _proposal: ProposalId,
            _vote: Vote,
        ) -> Result<(), ConnectorError> {
            Ok(())
        }
    }

    fn directory() -> SystemDirectory {
        SystemDirectory::new(Arc::new(NullPrimary))
    }

    #[test]
    fn primary_is_always_resolvable() {
        let directory = directory();
        let connector = directory.lookup(&GovernanceSystemId::primary()).unwrap();
        assert!(connector.is_primary());
        assert_eq!(connector.system(), GovernanceSystemId::primary());
    }

    #[test]
    fn secondary_lookup_requires_registration() {
        let directory = directory();
        let system = GovernanceSystemId::new("sns-alpha").unwrap();

        assert!(directory.lookup(&system).is_none());

        directory
            .register_secondary(system.clone(), Arc::new(NullSecondary))
            .unwrap();
        let connector = directory.lookup(&system).unwrap();
        assert!(!connector.is_primary());
        assert_eq!(connector.system(), system);
    }

    #[test]
    fn primary_id_cannot_be_registered_as_secondary() {
        let directory = directory();
        let result =
            directory.register_secondary(GovernanceSystemId::primary(), Arc::new(NullSecondary));
        assert!(matches!(result, Err(DirectoryError::PrimaryIdReserved)));
    }

    #[test]
    fn removal_forgets_the_system() {
        let directory = directory();
        let system = GovernanceSystemId::new("sns-alpha").unwrap();
        directory
            .register_secondary(system.clone(), Arc::new(NullSecondary))
            .unwrap();

        assert!(directory.remove_secondary(&system));
        assert!(directory.lookup(&system).is_none());
        assert!(!directory.remove_secondary(&system));
        assert!(!directory.remove_secondary(&GovernanceSystemId::primary()));
    }

    #[test]
    fn systems_lists_primary_first_then_sorted_secondaries() {
        let directory = directory();
        for name in ["sns-gamma", "sns-alpha"] {
            directory
                .register_secondary(
                    GovernanceSystemId::new(name).unwrap(),
                    Arc::new(NullSecondary),
                )
                .unwrap();
        }

        let ids: Vec<String> = directory
            .systems()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                GovernanceSystemId::primary().as_str().to_string(),
                "sns-alpha".to_string(),
                "sns-gamma".to_string(),
            ]
        );
    }
}
