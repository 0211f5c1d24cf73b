//! Error types for the stakewatch pipeline.

use thiserror::Error;

/// Errors that can occur while scraping, merging, or persisting.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Transport/RPC failure. Recoverable: retry the identical range.
    #[error("upstream RPC error: {0}")]
    Upstream(String),

    /// Two different non-zero coinbases observed for one attester.
    ///
    /// Fatal to the current scrape — never auto-resolved, must reach an
    /// operator with both values and block numbers intact.
    #[error(
        "coinbase conflict for attester {attester}: \
         {existing_coinbase} @ block {existing_block} vs \
         {incoming_coinbase} @ block {incoming_block}"
    )]
    Conflict {
        attester: String,
        existing_coinbase: String,
        existing_block: u64,
        incoming_coinbase: String,
        incoming_block: u64,
    },

    /// Persisted snapshot failed schema validation on load.
    #[error("cache snapshot for network '{network}' is corrupt: {reason}")]
    CacheCorrupt { network: String, reason: String },

    /// Snapshot persistence failure.
    #[error("store error: {0}")]
    Store(String),

    /// A notification hook failed. Logged at the dispatch site, never fatal.
    #[error("hook '{name}' failed: {reason}")]
    Hook { name: String, reason: String },
}

impl MonitorError {
    /// Returns `true` if the error is a transient upstream failure
    /// (the same range may simply be retried).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Upstream(_))
    }

    /// Returns `true` if the error is a reconciliation conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}
