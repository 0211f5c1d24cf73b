//! The per-network poll loop.
//!
//! One `NetworkMonitor` owns one network's reconciler, lifecycle registry,
//! and state reader, and is the only task that drives them — polls run to
//! completion before the next is scheduled, so no two merges for the same
//! network can interleave. Multiple networks get independent monitors.
//!
//! Each cycle: scrape the incremental event tail, read the provider and
//! rollup queues, read each watched attester's on-chain view, advance every
//! attester through the state machine, and notify hooks of committed changes.

use std::sync::Arc;
use std::time::Duration;

use stakewatch_core::error::MonitorError;
use stakewatch_core::hook::HookRegistry;
use stakewatch_core::lifecycle::{queue_contains, LifecycleRegistry, Signals};

use crate::client::{RpcClient, StateReader};
use crate::scraper::Reconciler;

/// Counters for one completed poll cycle.
#[derive(Debug, Clone, Default)]
pub struct PollSummary {
    pub new_mappings: u64,
    pub updated_mappings: u64,
    pub state_changes: u64,
    pub tracked_attesters: usize,
}

/// Monitors one network: reconciles coinbases and advances attester states.
pub struct NetworkMonitor<C: RpcClient, R: StateReader> {
    reconciler: Reconciler<C>,
    reader: R,
    registry: LifecycleRegistry,
    hooks: Arc<HookRegistry>,
}

impl<C: RpcClient, R: StateReader> NetworkMonitor<C, R> {
    pub fn new(reconciler: Reconciler<C>, reader: R, hooks: Arc<HookRegistry>) -> Self {
        let registry = LifecycleRegistry::new(reconciler.config().network.as_str());
        Self {
            reconciler,
            reader,
            registry,
            hooks,
        }
    }

    /// The lifecycle registry (read access for gauges/inspection).
    pub fn registry(&self) -> &LifecycleRegistry {
        &self.registry
    }

    /// Run one full poll cycle to completion.
    pub async fn poll_once(&mut self) -> Result<PollSummary, MonitorError> {
        let network = self.reconciler.config().network.clone();
        let provider_id = self.reconciler.config().provider_id;

        let reconciled = self.reconciler.scrape_incremental().await?;
        let provider_queue = self.reader.provider_queue(provider_id).await?;
        let rollup_queue = self.reader.rollup_queue().await?;

        let watched: Vec<String> = self
            .reconciler
            .config()
            .watch_set
            .iter()
            .map(str::to_string)
            .collect();

        let mut state_changes = 0u64;
        for address in &watched {
            let view = self.reader.attester_view(address).await?;
            let signals = Signals {
                has_coinbase: reconciled.snapshot.has_coinbase(address),
                in_provider_queue: queue_contains(&provider_queue, address),
                in_rollup_queue: queue_contains(&rollup_queue, address),
                chain_status: view.as_ref().map(|v| v.status).unwrap_or_default(),
            };
            if let Some(change) = self.registry.observe(address, &signals, view) {
                state_changes += 1;
                self.hooks
                    .dispatch_state_change(&network, &change.attester, change.from, change.to)
                    .await;
            }
        }

        Ok(PollSummary {
            new_mappings: reconciled.new_mappings,
            updated_mappings: reconciled.updated_mappings,
            state_changes,
            tracked_attesters: self.registry.len(),
        })
    }

    /// Poll forever.
    ///
    /// Transient upstream/store failures are logged and retried next tick; a
    /// reconciliation conflict stops the loop — it needs a human, and running
    /// on would keep re-hitting it anyway.
    pub async fn run(&mut self) -> Result<(), MonitorError> {
        let interval = Duration::from_millis(self.reconciler.config().poll_interval_ms);
        let network = self.reconciler.config().network.clone();
        tracing::info!(
            %network,
            poll_interval_ms = interval.as_millis() as u64,
            watch_set = self.reconciler.config().watch_set.len(),
            "Starting network monitor"
        );

        loop {
            match self.poll_once().await {
                Ok(summary) => tracing::info!(
                    %network,
                    new = summary.new_mappings,
                    updated = summary.updated_mappings,
                    state_changes = summary.state_changes,
                    tracked = summary.tracked_attesters,
                    "Poll cycle complete"
                ),
                Err(err) if err.is_conflict() => {
                    tracing::error!(%network, %err, "Reconciliation conflict — stopping monitor");
                    return Err(err);
                }
                Err(err) => {
                    tracing::warn!(%network, %err, "Poll cycle failed; retrying next tick")
                }
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use stakewatch_core::config::MonitorConfig;
    use stakewatch_core::hook::MonitorHook;
    use stakewatch_core::lifecycle::{AttesterState, AttesterView, ChainStatus};
    use stakewatch_core::types::{CoinbaseMapping, WatchSet};
    use stakewatch_store::memory::MemorySnapshotStore;

    use crate::client::{BlockHeader, LogFilter, RawLog};

    const A1: &str = "0xaaa0000000000000000000000000000000000001";
    const C1: &str = "0xccc0000000000000000000000000000000000001";

    fn padded(addr: &str) -> String {
        format!("0x{:0>64}", addr.strip_prefix("0x").unwrap_or(addr))
    }

    fn binding_log(attester: &str, coinbase: &str, block: u64) -> RawLog {
        RawLog {
            address: "0xregistry".into(),
            topics: vec!["0xc0ffee00".into(), padded(attester)],
            data: padded(coinbase),
            block_number: format!("{block:#x}"),
            block_hash: format!("0xhash{block}"),
            tx_hash: format!("0xtx{block}"),
            removed: None,
        }
    }

    /// Scriptable chain + staking state shared with the test body.
    #[derive(Default)]
    struct FakeWorld {
        head: Mutex<u64>,
        logs: Mutex<Vec<RawLog>>,
        provider_queue: Mutex<Vec<String>>,
        rollup_queue: Mutex<Vec<String>>,
        views: Mutex<HashMap<String, AttesterView>>,
    }

    #[async_trait]
    impl RpcClient for Arc<FakeWorld> {
        async fn get_block_number(&self) -> Result<u64, MonitorError> {
            Ok(*self.head.lock().unwrap())
        }

        async fn get_block(&self, number: u64) -> Result<Option<BlockHeader>, MonitorError> {
            Ok(Some(BlockHeader {
                number,
                hash: format!("0xhash{number}"),
                timestamp: (number * 12) as i64,
            }))
        }

        async fn get_logs(
            &self,
            from: u64,
            to: u64,
            _filter: &LogFilter,
        ) -> Result<Vec<RawLog>, MonitorError> {
            Ok(self
                .logs
                .lock()
                .unwrap()
                .iter()
                .filter(|l| (from..=to).contains(&l.block_number_u64()))
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl StateReader for Arc<FakeWorld> {
        async fn provider_queue(&self, _provider_id: u64) -> Result<Vec<String>, MonitorError> {
            Ok(self.provider_queue.lock().unwrap().clone())
        }

        async fn rollup_queue(&self) -> Result<Vec<String>, MonitorError> {
            Ok(self.rollup_queue.lock().unwrap().clone())
        }

        async fn attester_view(
            &self,
            address: &str,
        ) -> Result<Option<AttesterView>, MonitorError> {
            Ok(self
                .views
                .lock()
                .unwrap()
                .get(&address.to_ascii_lowercase())
                .cloned())
        }
    }

    struct ChangeCounter(AtomicU32);

    #[async_trait]
    impl MonitorHook for ChangeCounter {
        async fn on_mapping(
            &self,
            _network: &str,
            _mapping: &CoinbaseMapping,
        ) -> Result<(), MonitorError> {
            Ok(())
        }
        async fn on_state_change(
            &self,
            _network: &str,
            _attester: &str,
            _from: AttesterState,
            _to: AttesterState,
        ) -> Result<(), MonitorError> {
            self.0.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn name(&self) -> &str {
            "change-counter"
        }
    }

    fn monitor(
        world: Arc<FakeWorld>,
        hooks: Arc<HookRegistry>,
    ) -> NetworkMonitor<Arc<FakeWorld>, Arc<FakeWorld>> {
        let config = MonitorConfig {
            network: "testnet".into(),
            provider_id: 7,
            registry_address: "0xregistry".into(),
            event_topic: "0xc0ffee00".into(),
            deployment_block: 0,
            chunk_size: 1000,
            poll_interval_ms: 10,
            watch_set: WatchSet::new([A1]),
        };
        let reconciler = Reconciler::new(
            config,
            world.clone(),
            Box::new(MemorySnapshotStore::new()),
            hooks.clone(),
        );
        NetworkMonitor::new(reconciler, world, hooks)
    }

    #[tokio::test]
    async fn attester_walks_to_active_across_polls() {
        let world = Arc::new(FakeWorld::default());
        *world.head.lock().unwrap() = 100;

        let counter = Arc::new(ChangeCounter(AtomicU32::new(0)));
        let mut hooks = HookRegistry::new();
        hooks.register(counter.clone());
        let mut monitor = monitor(world.clone(), Arc::new(hooks));

        // Cycle 1: no coinbase, waiting in the provider queue.
        world.provider_queue.lock().unwrap().push(A1.into());
        let summary = monitor.poll_once().await.unwrap();
        assert_eq!(summary.state_changes, 1);
        assert_eq!(
            monitor.registry().get(A1).unwrap().state,
            AttesterState::InProviderQueue
        );

        // Cycle 2: the coinbase binding lands on chain.
        world.logs.lock().unwrap().push(binding_log(A1, C1, 150));
        *world.head.lock().unwrap() = 200;
        let summary = monitor.poll_once().await.unwrap();
        assert_eq!(summary.new_mappings, 1);
        assert_eq!(
            monitor.registry().get(A1).unwrap().state,
            AttesterState::RollupEntryQueue
        );

        // Cycle 3: the rollup reports the attester as validating.
        world.views.lock().unwrap().insert(
            A1.into(),
            AttesterView {
                status: ChainStatus::Validating,
                effective_balance: 32,
                exit: None,
            },
        );
        *world.head.lock().unwrap() = 300;
        monitor.poll_once().await.unwrap();
        assert_eq!(monitor.registry().get(A1).unwrap().state, AttesterState::Active);

        assert_eq!(counter.0.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn exited_attester_is_demoted() {
        let world = Arc::new(FakeWorld::default());
        *world.head.lock().unwrap() = 100;
        world.logs.lock().unwrap().push(binding_log(A1, C1, 50));
        world.views.lock().unwrap().insert(
            A1.into(),
            AttesterView {
                status: ChainStatus::Validating,
                effective_balance: 32,
                exit: None,
            },
        );

        let mut monitor = monitor(world.clone(), Arc::new(HookRegistry::new()));

        // First observation lands in the entry queue and the validating
        // status promotes it in the same cycle; a second poll is steady-state.
        monitor.poll_once().await.unwrap();
        monitor.poll_once().await.unwrap();
        assert_eq!(monitor.registry().get(A1).unwrap().state, AttesterState::Active);

        world.views.lock().unwrap().get_mut(A1).unwrap().status = ChainStatus::Exiting;
        monitor.poll_once().await.unwrap();
        assert_eq!(
            monitor.registry().get(A1).unwrap().state,
            AttesterState::NoLongerActive
        );
    }

    #[tokio::test]
    async fn stable_world_reports_no_changes() {
        let world = Arc::new(FakeWorld::default());
        *world.head.lock().unwrap() = 100;

        let mut monitor = monitor(world.clone(), Arc::new(HookRegistry::new()));
        monitor.poll_once().await.unwrap(); // first observation creates the record in New
        let summary = monitor.poll_once().await.unwrap();
        assert_eq!(summary.state_changes, 0);
        assert_eq!(summary.tracked_attesters, 1);
        assert_eq!(monitor.registry().get(A1).unwrap().state, AttesterState::New);
    }
}
