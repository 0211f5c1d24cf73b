//! Notification hooks + registry.
//!
//! The reconciliation engine and the lifecycle registry only *report*
//! committed facts; what a subscriber does with them (propose a funding
//! transaction, bump a gauge) is outside the core. Hook failures are logged
//! and never abort the poll that produced the notification.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::MonitorError;
use crate::lifecycle::AttesterState;
use crate::types::CoinbaseMapping;

/// Subscriber for committed mapping changes and attester state changes.
#[async_trait]
pub trait MonitorHook: Send + Sync {
    /// Called once per mapping that was inserted or updated by a persisted merge.
    async fn on_mapping(&self, network: &str, mapping: &CoinbaseMapping)
        -> Result<(), MonitorError>;

    /// Called once per committed attester state change.
    async fn on_state_change(
        &self,
        network: &str,
        attester: &str,
        from: AttesterState,
        to: AttesterState,
    ) -> Result<(), MonitorError>;

    /// Name used in logs when the hook fails.
    fn name(&self) -> &str;
}

/// Registry of hooks. Dispatch swallows (and logs) individual hook errors so
/// one broken subscriber cannot stall reconciliation.
#[derive(Default)]
pub struct HookRegistry {
    hooks: Vec<Arc<dyn MonitorHook>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hook: Arc<dyn MonitorHook>) {
        self.hooks.push(hook);
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Notify all hooks of a committed mapping.
    pub async fn dispatch_mapping(&self, network: &str, mapping: &CoinbaseMapping) {
        for hook in &self.hooks {
            if let Err(err) = hook.on_mapping(network, mapping).await {
                tracing::warn!(
                    hook = hook.name(),
                    attester = %mapping.attester_address,
                    %err,
                    "Mapping hook failed"
                );
            }
        }
    }

    /// Notify all hooks of a committed state change.
    pub async fn dispatch_state_change(
        &self,
        network: &str,
        attester: &str,
        from: AttesterState,
        to: AttesterState,
    ) {
        for hook in &self.hooks {
            if let Err(err) = hook.on_state_change(network, attester, from, to).await {
                tracing::warn!(hook = hook.name(), attester, %err, "State-change hook failed");
            }
        }
    }
}
