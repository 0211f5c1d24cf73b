//! The reconciliation engine.
//!
//! Scrapes coinbase-binding events in fixed-size block chunks, filters to the
//! configured watch-set, and merges the results into the persisted snapshot
//! under the strict conflict policy in [`stakewatch_core::merge`].
//!
//! Scraping is pure read + merge: a failed or abandoned scrape leaves the
//! persisted snapshot untouched, and the same range can always be retried.
//! Callers must serialize `scrape_full`/`scrape_incremental` per network —
//! the engine assumes it is the only writer of its snapshot.

use std::collections::HashMap;
use std::sync::Arc;

use stakewatch_core::config::MonitorConfig;
use stakewatch_core::error::MonitorError;
use stakewatch_core::hook::HookRegistry;
use stakewatch_core::merge::merge_mappings;
use stakewatch_core::snapshot::{CoinbaseSnapshot, SnapshotStore, SNAPSHOT_VERSION};
use stakewatch_core::types::CoinbaseMapping;

use crate::client::{decode_coinbase_binding, LogFilter, RpcClient};

/// Result of one full or incremental reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileResult {
    /// Attesters seen for the first time.
    pub new_mappings: u64,
    /// Attesters whose mapping advanced.
    pub updated_mappings: u64,
    /// The merged (and, unless the scrape was a no-op, persisted) snapshot.
    pub snapshot: CoinbaseSnapshot,
}

/// Per-network reconciliation engine. Exclusively owns snapshot mutation.
pub struct Reconciler<C: RpcClient> {
    config: MonitorConfig,
    client: C,
    store: Box<dyn SnapshotStore>,
    hooks: Arc<HookRegistry>,
}

impl<C: RpcClient> Reconciler<C> {
    pub fn new(
        config: MonitorConfig,
        client: C,
        store: Box<dyn SnapshotStore>,
        hooks: Arc<HookRegistry>,
    ) -> Self {
        Self {
            config,
            client,
            store,
            hooks,
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Scrape `[from, to]` for coinbase bindings of watched attesters.
    ///
    /// Chunks are fetched in increasing block order, so within one call the
    /// returned mappings are block-ascending per chunk and merge
    /// deterministically. Any chunk failure aborts the whole range.
    pub async fn scrape_range(
        &self,
        from: u64,
        to: u64,
    ) -> Result<Vec<CoinbaseMapping>, MonitorError> {
        if to < from {
            return Ok(vec![]);
        }

        let filter = LogFilter {
            address: self.config.registry_address.clone(),
            topic0: self.config.event_topic.clone(),
        };

        let mut mappings = Vec::new();
        let mut timestamps: HashMap<u64, i64> = HashMap::new();
        let mut start = from;
        while start <= to {
            let end = start
                .saturating_add(self.config.chunk_size.max(1) - 1)
                .min(to);
            let logs = self.client.get_logs(start, end, &filter).await?;
            tracing::debug!(
                network = %self.config.network,
                from = start,
                to = end,
                logs = logs.len(),
                "Scraped log chunk"
            );

            for log in &logs {
                if log.is_removed() {
                    continue;
                }
                let Some((attester, coinbase)) = decode_coinbase_binding(log) else {
                    tracing::warn!(
                        network = %self.config.network,
                        tx = %log.tx_hash,
                        "Skipping undecodable coinbase-binding log"
                    );
                    continue;
                };
                if !self.config.watch_set.contains(&attester) {
                    continue;
                }

                let block_number = log.block_number_u64();
                let timestamp = match timestamps.get(&block_number) {
                    Some(ts) => *ts,
                    None => {
                        let header =
                            self.client.get_block(block_number).await?.ok_or_else(|| {
                                MonitorError::Upstream(format!(
                                    "block {block_number} not found while resolving timestamp"
                                ))
                            })?;
                        timestamps.insert(block_number, header.timestamp);
                        header.timestamp
                    }
                };

                mappings.push(CoinbaseMapping {
                    attester_address: attester,
                    coinbase_address: coinbase,
                    block_number,
                    block_hash: log.block_hash.clone(),
                    timestamp,
                });
            }
            start = end + 1;
        }
        Ok(mappings)
    }

    /// Scan the full event history (deployment block → head), merge into any
    /// existing snapshot, and persist.
    pub async fn scrape_full(&self) -> Result<ReconcileResult, MonitorError> {
        let head = self.client.get_block_number().await?;
        let existing = self.load_or_discard().await?;
        tracing::info!(
            network = %self.config.network,
            from = self.config.deployment_block,
            to = head,
            cached = existing.is_some(),
            "Starting full coinbase scrape"
        );
        let incoming = self.scrape_range(self.config.deployment_block, head).await?;
        self.merge_and_persist(existing, &incoming, head).await
    }

    /// Scan the tail since the last persisted scan height.
    ///
    /// Delegates to [`Self::scrape_full`] when no cache exists; a no-op
    /// (returning the existing snapshot unchanged) when the tail is empty.
    pub async fn scrape_incremental(&self) -> Result<ReconcileResult, MonitorError> {
        let Some(existing) = self.load_or_discard().await? else {
            return self.scrape_full().await;
        };

        let head = self.client.get_block_number().await?;
        let from = existing.last_scanned_block + 1;
        if from > head {
            tracing::debug!(
                network = %self.config.network,
                last_scanned = existing.last_scanned_block,
                head,
                "No new blocks since last scrape"
            );
            return Ok(ReconcileResult {
                new_mappings: 0,
                updated_mappings: 0,
                snapshot: existing,
            });
        }

        let incoming = self.scrape_range(from, head).await?;
        self.merge_and_persist(Some(existing), &incoming, head).await
    }

    /// Merge + persist + notify. Conflicts propagate before anything is
    /// written, so a failed merge leaves the stored snapshot untouched.
    async fn merge_and_persist(
        &self,
        existing: Option<CoinbaseSnapshot>,
        incoming: &[CoinbaseMapping],
        scanned_to: u64,
    ) -> Result<ReconcileResult, MonitorError> {
        let (base, floor) = match &existing {
            Some(snap) => (snap.mappings.clone(), snap.last_scanned_block),
            None => (HashMap::new(), 0),
        };

        let outcome = merge_mappings(&base, incoming)?;

        let snapshot = CoinbaseSnapshot {
            network: self.config.network.clone(),
            staking_provider_id: self.config.provider_id,
            // Never lets the persisted scan height move backwards.
            last_scanned_block: scanned_to.max(floor),
            mappings: outcome.merged,
            scraped_at: chrono::Utc::now().timestamp(),
            version: SNAPSHOT_VERSION,
        };
        let path = self.store.save(&snapshot).await?;

        tracing::info!(
            network = %self.config.network,
            new = outcome.new_mappings,
            updated = outcome.updated_mappings,
            total = snapshot.mappings.len(),
            last_scanned = snapshot.last_scanned_block,
            %path,
            "Persisted coinbase snapshot"
        );

        for mapping in &outcome.changed {
            self.hooks.dispatch_mapping(&self.config.network, mapping).await;
        }

        Ok(ReconcileResult {
            new_mappings: outcome.new_mappings,
            updated_mappings: outcome.updated_mappings,
            snapshot,
        })
    }

    /// Load the persisted snapshot; a corrupt one is discarded (loudly) so
    /// the caller falls back to a full rescrape. The file itself is left in
    /// place until the next successful save overwrites it.
    async fn load_or_discard(&self) -> Result<Option<CoinbaseSnapshot>, MonitorError> {
        match self.store.load(&self.config.network).await {
            Ok(snapshot) => Ok(snapshot),
            Err(err @ MonitorError::CacheCorrupt { .. }) => {
                tracing::warn!(
                    network = %self.config.network,
                    %err,
                    "Discarding corrupt coinbase snapshot; forcing full rescrape"
                );
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}
