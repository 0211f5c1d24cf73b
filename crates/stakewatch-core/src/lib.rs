//! stakewatch-core — coinbase reconciliation model and attester lifecycle.
//!
//! # Architecture
//!
//! ```text
//! MonitorBuilder → NetworkMonitor (stakewatch-evm)
//!                      ├── Reconciler        (chunked scrape + strict merge)
//!                      ├── LifecycleRegistry (per-attester state machine)
//!                      ├── HookRegistry      (mapping / state-change subscribers)
//!                      └── SnapshotStore     (memory / JSON file, stakewatch-store)
//! ```

pub mod config;
pub mod error;
pub mod hook;
pub mod lifecycle;
pub mod merge;
pub mod snapshot;
pub mod types;

pub use config::{MonitorConfig, DEFAULT_CHUNK_SIZE};
pub use error::MonitorError;
pub use hook::{HookRegistry, MonitorHook};
pub use lifecycle::{
    advance, AttesterRecord, AttesterState, AttesterView, ChainStatus, LifecycleRegistry, Signals,
    StateChange,
};
pub use merge::{merge_mappings, MergeOutcome};
pub use snapshot::{CoinbaseSnapshot, SnapshotStore, SNAPSHOT_VERSION};
pub use types::{CoinbaseMapping, WatchSet, ZERO_ADDRESS};
