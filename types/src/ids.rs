use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known id of the primary governance system.
///
/// Secondary systems are discovered at runtime; the primary one is fixed for
/// the lifetime of the application.
pub const PRIMARY_SYSTEM_ID: &str = "governance-primary";

#[derive(Debug, Error)]
#[error("identifier must not be empty")]
pub struct EmptyIdError;

/// Opaque identifier of one governance system (ledger).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GovernanceSystemId(String);

impl GovernanceSystemId {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyIdError)
        } else {
            Ok(Self(value))
        }
    }

    /// The fixed, well-known primary system.
    #[must_use]
    pub fn primary() -> Self {
        Self(PRIMARY_SYSTEM_ID.to_string())
    }

    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.0 == PRIMARY_SYSTEM_ID
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GovernanceSystemId {
    type Error = EmptyIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for GovernanceSystemId {
    type Error = EmptyIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GovernanceSystemId> for String {
    fn from(value: GovernanceSystemId) -> Self {
        value.0
    }
}

impl fmt::Display for GovernanceSystemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a voting unit (neuron) within one governance system.
///
/// The textual form is decimal for the primary system and hex for secondary
/// systems; the core treats it as opaque either way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UnitId(String);

impl UnitId {
    pub fn new(value: impl Into<String>) -> Result<Self, EmptyIdError> {
        let value = value.into();
        if value.trim().is_empty() {
            Err(EmptyIdError)
        } else {
            Ok(Self(value))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UnitId {
    type Error = EmptyIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for UnitId {
    type Error = EmptyIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitId> for String {
    fn from(value: UnitId) -> Self {
        value.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(u64);

impl ProposalId {
    #[must_use]
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Monotonic write sequence number assigned by the entity store.
///
/// Writes for the same key are totally ordered by this value, not by call
/// issue time or arrival time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WriteSeq(u64);

impl WriteSeq {
    #[must_use]
    pub fn new(seq: u64) -> Self {
        Self(seq)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }

    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for WriteSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_id_rejects_empty() {
        assert!(GovernanceSystemId::new("").is_err());
        assert!(GovernanceSystemId::new("   ").is_err());
        assert!(GovernanceSystemId::new("sns-alpha").is_ok());
    }

    #[test]
    fn primary_id_is_recognized() {
        let primary = GovernanceSystemId::primary();
        assert!(primary.is_primary());

        let secondary = GovernanceSystemId::new("sns-alpha").unwrap();
        assert!(!secondary.is_primary());
    }

    #[test]
    fn unit_id_roundtrips_through_serde() {
        let id = UnitId::new("01a9").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"01a9\"");
        let back: UnitId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn unit_id_rejects_empty_in_serde() {
        let parsed: Result<UnitId, _> = serde_json::from_str("\"\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn write_seq_is_ordered_and_advances() {
        let a = WriteSeq::new(5);
        let b = a.next();
        assert!(b > a);
        assert_eq!(b.value(), 6);
    }
}
