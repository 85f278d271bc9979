//! Voting units (neurons).

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::UnitId;

/// Dissolve state of a unit's stake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitState {
    Locked,
    Dissolving,
    Dissolved,
}

/// Operations the current identity may perform on a unit.
///
/// The core consults only [`Permission::Vote`]; the rest are carried for
/// hosts that render or gate management actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Permission {
    Vote,
    SubmitProposal,
    ManagePrincipals,
    Disburse,
}

/// A stake-holding voting entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub stake: u64,
    pub state: UnitState,
    pub dissolve_delay_seconds: u64,
    pub created_timestamp_seconds: u64,
    pub permissions: BTreeSet<Permission>,
}

impl Unit {
    /// Whether the current identity holds the vote permission on this unit.
    ///
    /// This is a caller-side preselection helper; vote eligibility for a
    /// specific proposal is decided by that proposal's ballot set.
    #[must_use]
    pub fn may_vote(&self) -> bool {
        self.permissions.contains(&Permission::Vote)
    }
}
