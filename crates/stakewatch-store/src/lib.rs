//! Snapshot persistence backends for stakewatch.
//!
//! `MemorySnapshotStore` backs tests and ephemeral monitors; `JsonFileStore`
//! is the production backend — one versioned JSON file per network, written
//! atomically (temp + rename).

pub mod file;
pub mod memory;

pub use file::JsonFileStore;
pub use memory::MemorySnapshotStore;
