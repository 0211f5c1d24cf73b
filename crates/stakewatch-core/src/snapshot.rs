//! Persisted coinbase cache snapshot.
//!
//! One snapshot per network holds the last-reconciled mapping set and the
//! last scanned block height. Snapshots are written whole and atomically;
//! `last_scanned_block` never decreases across successive persisted
//! snapshots.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MonitorError;
use crate::types::CoinbaseMapping;

/// Literal schema version tag for forward-compatible parsing.
pub const SNAPSHOT_VERSION: u32 = 1;

/// The per-network reconciled cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinbaseSnapshot {
    /// Network slug (e.g. `"mainnet"`).
    pub network: String,
    /// Staking provider this cache was scraped for.
    pub staking_provider_id: u64,
    /// Highest block height covered by the mapping set.
    pub last_scanned_block: u64,
    /// Mapping set, keyed by lower-cased attester address.
    pub mappings: HashMap<String, CoinbaseMapping>,
    /// Unix timestamp of when this snapshot was persisted.
    pub scraped_at: i64,
    /// Schema version (see [`SNAPSHOT_VERSION`]).
    pub version: u32,
}

impl CoinbaseSnapshot {
    /// A fresh, empty snapshot for a network.
    pub fn empty(network: impl Into<String>, staking_provider_id: u64) -> Self {
        Self {
            network: network.into(),
            staking_provider_id,
            last_scanned_block: 0,
            mappings: HashMap::new(),
            scraped_at: 0,
            version: SNAPSHOT_VERSION,
        }
    }

    /// Returns `true` if `attester` has a non-placeholder coinbase mapping.
    pub fn has_coinbase(&self, attester: &str) -> bool {
        self.mappings
            .get(&crate::types::normalize_address(attester))
            .map(|m| !m.is_placeholder())
            .unwrap_or(false)
    }

    /// Schema validation applied on load. A failure means the persisted file
    /// is corrupt and must be treated as "no cache" — loudly, by the caller.
    pub fn validate(&self) -> Result<(), MonitorError> {
        let corrupt = |reason: String| MonitorError::CacheCorrupt {
            network: self.network.clone(),
            reason,
        };
        if self.version != SNAPSHOT_VERSION {
            return Err(corrupt(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )));
        }
        if self.network.is_empty() {
            return Err(corrupt("empty network name".into()));
        }
        for (key, mapping) in &self.mappings {
            if key != &mapping.key() {
                return Err(corrupt(format!(
                    "mapping key '{key}' does not match attester '{}'",
                    mapping.attester_address
                )));
            }
            if mapping.block_number > self.last_scanned_block {
                return Err(corrupt(format!(
                    "mapping for '{key}' observed at block {} beyond lastScannedBlock {}",
                    mapping.block_number, self.last_scanned_block
                )));
            }
        }
        Ok(())
    }
}

/// Trait for persisting and loading per-network snapshots.
///
/// `save` must be atomic: a crash mid-write never leaves a partially-written
/// snapshot observable to the next `load`.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Load the snapshot for a network. `Ok(None)` when none exists;
    /// `Err(CacheCorrupt)` when one exists but fails validation.
    async fn load(&self, network: &str) -> Result<Option<CoinbaseSnapshot>, MonitorError>;

    /// Persist a snapshot whole, returning the path (or key) it landed at.
    async fn save(&self, snapshot: &CoinbaseSnapshot) -> Result<String, MonitorError>;

    /// Remove a network's snapshot (operator reset).
    async fn delete(&self, network: &str) -> Result<(), MonitorError>;
}
