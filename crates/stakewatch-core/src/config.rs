//! Monitor configuration.

use serde::{Deserialize, Serialize};

use crate::types::WatchSet;

/// How many blocks each `eth_getLogs` chunk spans. Network-independent;
/// chosen to stay under typical provider log-return limits.
pub const DEFAULT_CHUNK_SIZE: u64 = 1000;

/// Configuration for one network's monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Network slug (e.g. `"mainnet"`), also the snapshot key.
    pub network: String,
    /// Staking provider whose attesters we reconcile.
    pub provider_id: u64,
    /// Registry contract emitting the coinbase-binding event.
    pub registry_address: String,
    /// topic[0] of the coinbase-binding event.
    pub event_topic: String,
    /// Block at which the registry contract was deployed on this network.
    /// Full scans start here.
    pub deployment_block: u64,
    /// Blocks per `eth_getLogs` chunk.
    pub chunk_size: u64,
    /// Poll interval between lifecycle cycles (milliseconds).
    pub poll_interval_ms: u64,
    /// Attesters this monitor tracks.
    pub watch_set: WatchSet,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            network: "mainnet".into(),
            provider_id: 0,
            registry_address: String::new(),
            event_topic: String::new(),
            deployment_block: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
            poll_interval_ms: 30_000,
            watch_set: WatchSet::default(),
        }
    }
}
