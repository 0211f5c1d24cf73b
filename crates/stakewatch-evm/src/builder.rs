//! Fluent builder API for monitor configuration.
//!
//! # Example
//!
//! ```rust,no_run
//! use stakewatch_evm::MonitorBuilder;
//!
//! let config = MonitorBuilder::new()
//!     .network("mainnet")
//!     .provider_id(42)
//!     .registry_address("0x1b7a2870d1627d88c33990fd8b63bec7b06b0e74")
//!     .deployment_block(21_000_000)
//!     .watch(["0x1f6bc61dba5c6fcef0a3b0b6b5a86cf4f1ae3bd6"])
//!     .build_config();
//! ```

use stakewatch_core::config::MonitorConfig;
use stakewatch_core::types::WatchSet;

/// Fluent builder for [`MonitorConfig`].
#[derive(Default)]
pub struct MonitorBuilder {
    config: MonitorConfig,
}

impl MonitorBuilder {
    pub fn new() -> Self {
        Self {
            config: MonitorConfig::default(),
        }
    }

    /// Set the network slug (also the snapshot key).
    pub fn network(mut self, network: impl Into<String>) -> Self {
        self.config.network = network.into();
        self
    }

    /// Set the staking provider whose attesters are reconciled.
    pub fn provider_id(mut self, id: u64) -> Self {
        self.config.provider_id = id;
        self
    }

    /// Set the registry contract emitting the coinbase-binding event.
    pub fn registry_address(mut self, address: impl Into<String>) -> Self {
        self.config.registry_address = address.into();
        self
    }

    /// Set topic[0] of the coinbase-binding event.
    pub fn event_topic(mut self, topic: impl Into<String>) -> Self {
        self.config.event_topic = topic.into();
        self
    }

    /// Set the registry deployment block (full scans start here).
    pub fn deployment_block(mut self, block: u64) -> Self {
        self.config.deployment_block = block;
        self
    }

    /// Set the blocks-per-`eth_getLogs` chunk width.
    pub fn chunk_size(mut self, size: u64) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the poll interval in milliseconds.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// Set the watched attester addresses.
    pub fn watch(mut self, addresses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.config.watch_set = WatchSet::new(addresses);
        self
    }

    /// Build the [`MonitorConfig`].
    pub fn build_config(self) -> MonitorConfig {
        self.config
    }
}
