//! Engine configuration.
//!
//! Constructed programmatically by the host; loading it from a file or the
//! environment is the host's concern.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use synod_types::{DEFAULT_PROPOSAL_PAGE_LIMIT, GovernanceSystemId};

use crate::sync::SyncStrategy;

fn default_page_limit() -> u32 {
    DEFAULT_PROPOSAL_PAGE_LIMIT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Overall deadline for one `sync` batch across all targeted systems.
    /// `None` leaves the deadline to the transport's own per-call limits.
    #[serde(default)]
    pub sync_timeout: Option<Duration>,
    /// Read strategy for post-vote background refreshes.
    #[serde(default)]
    pub refresh_strategy: SyncStrategy,
    /// Page size for the post-vote proposals re-read.
    #[serde(default = "default_page_limit")]
    pub refresh_page_limit: u32,
    /// Systems whose actionable projections share the primary ledger's
    /// aggregation. A vote on the primary system also refreshes these.
    #[serde(default)]
    pub linked_actionable_systems: Vec<GovernanceSystemId>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sync_timeout: None,
            refresh_strategy: SyncStrategy::PreferFast,
            refresh_page_limit: DEFAULT_PROPOSAL_PAGE_LIMIT,
            linked_actionable_systems: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_post_vote_reload_shape() {
        let config = EngineConfig::default();
        assert_eq!(config.sync_timeout, None);
        assert_eq!(config.refresh_strategy, SyncStrategy::PreferFast);
        assert_eq!(config.refresh_page_limit, 20);
        assert!(config.linked_actionable_systems.is_empty());
    }

    #[test]
    fn missing_fields_deserialize_to_defaults() {
        let config: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.refresh_page_limit, 20);
        assert_eq!(config.refresh_strategy, SyncStrategy::PreferFast);
    }
}
