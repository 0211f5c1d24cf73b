//! In-memory snapshot store.
//!
//! All data is lost when the process exits. Clones share state, so a test
//! can hand a clone to the engine and keep one for assertions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use stakewatch_core::error::MonitorError;
use stakewatch_core::snapshot::{CoinbaseSnapshot, SnapshotStore};

#[derive(Default)]
struct Inner {
    data: Mutex<HashMap<String, CoinbaseSnapshot>>,
    saves: AtomicU64,
}

/// In-memory snapshot store for tests and ephemeral monitors.
#[derive(Default, Clone)]
pub struct MemorySnapshotStore {
    inner: Arc<Inner>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `save` calls so far.
    pub fn save_count(&self) -> u64 {
        self.inner.saves.load(Ordering::Relaxed)
    }

    /// Insert a snapshot without going through `save` (used by tests to
    /// plant invalid data and exercise the corrupt-cache path).
    pub fn insert_raw(&self, snapshot: CoinbaseSnapshot) {
        self.inner
            .data
            .lock()
            .unwrap()
            .insert(snapshot.network.clone(), snapshot);
    }
}

#[async_trait]
impl SnapshotStore for MemorySnapshotStore {
    async fn load(&self, network: &str) -> Result<Option<CoinbaseSnapshot>, MonitorError> {
        let snapshot = self.inner.data.lock().unwrap().get(network).cloned();
        if let Some(snap) = &snapshot {
            snap.validate()?;
        }
        Ok(snapshot)
    }

    async fn save(&self, snapshot: &CoinbaseSnapshot) -> Result<String, MonitorError> {
        self.inner
            .data
            .lock()
            .unwrap()
            .insert(snapshot.network.clone(), snapshot.clone());
        self.inner.saves.fetch_add(1, Ordering::Relaxed);
        Ok(format!("memory://{}", snapshot.network))
    }

    async fn delete(&self, network: &str) -> Result<(), MonitorError> {
        self.inner.data.lock().unwrap().remove(network);
        Ok(())
    }
}
