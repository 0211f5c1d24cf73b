//! Attester lifecycle state machine.
//!
//! Each tracked attester advances through:
//!
//! ```text
//! New → InProviderQueue → RollupEntryQueue → Active → NoLongerActive
//! ```
//!
//! driven by four independent signals per poll: coinbase presence, provider
//! queue membership, rollup entry-queue membership, and on-chain validation
//! status. The transition function is total and never panics — the monitor
//! loop must keep advancing other attesters even when one looks anomalous.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::types::normalize_address;

// ─── States & signals ────────────────────────────────────────────────────────

/// Lifecycle state of one attester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttesterState {
    /// Discovered, no coinbase yet, not queued anywhere we can see.
    New,
    /// Waiting in the staking provider's queue.
    InProviderQueue,
    /// Coinbase bound; waiting in (or headed for) the rollup entry queue.
    RollupEntryQueue,
    /// Validating on chain.
    Active,
    /// Exited after having been active. Reinstatement is an external action.
    NoLongerActive,
}

impl std::fmt::Display for AttesterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::InProviderQueue => write!(f, "in-provider-queue"),
            Self::RollupEntryQueue => write!(f, "rollup-entry-queue"),
            Self::Active => write!(f, "active"),
            Self::NoLongerActive => write!(f, "no-longer-active"),
        }
    }
}

/// On-chain validation status as reported by the rollup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChainStatus {
    /// Not known to the rollup (or fully exited).
    #[default]
    None,
    /// Actively validating.
    Validating,
    /// Slashed/stalled but not yet exited.
    Zombie,
    /// Exit in progress.
    Exiting,
}

/// The rollup's view of one attester.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttesterView {
    pub status: ChainStatus,
    pub effective_balance: u64,
    /// Exit epoch/amount info, present once an exit was initiated.
    pub exit: Option<ExitInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitInfo {
    pub exit_timestamp: i64,
    pub recipient: String,
}

/// The signal bundle evaluated once per poll cycle per attester.
#[derive(Debug, Clone, Copy, Default)]
pub struct Signals {
    pub has_coinbase: bool,
    pub in_provider_queue: bool,
    pub in_rollup_queue: bool,
    pub chain_status: ChainStatus,
}

/// Anomalies the transition function reports for logging. Soft only —
/// an anomaly never changes the computed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anomaly {
    /// Coinbase mapping disappeared while waiting in the entry queue.
    CoinbaseLostWhileQueued,
    /// Coinbase mapping disappeared while actively validating.
    /// A data-integrity alarm, not auto-recoverable.
    CoinbaseLostWhileActive,
}

/// Outcome of one `advance` evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: AttesterState,
    pub anomaly: Option<Anomaly>,
}

impl Transition {
    fn to(next: AttesterState) -> Self {
        Self {
            next,
            anomaly: None,
        }
    }

    fn stay(state: AttesterState) -> Self {
        Self::to(state)
    }

    fn stay_with(state: AttesterState, anomaly: Anomaly) -> Self {
        Self {
            next: state,
            anomaly: Some(anomaly),
        }
    }
}

// ─── Transition function ─────────────────────────────────────────────────────

/// Initial state for an attester observed for the first time.
pub fn initial_state(has_coinbase: bool) -> AttesterState {
    if has_coinbase {
        AttesterState::RollupEntryQueue
    } else {
        AttesterState::New
    }
}

/// Advance one attester by one poll cycle.
///
/// Pure and total: every `(state, signals)` combination yields a defined
/// state. The provider-queue check sits below the coinbase check because the
/// real-world ordering is provider queue → entry queue → active; a stale
/// lower-priority signal must not override a higher-priority one.
pub fn advance(current: AttesterState, signals: &Signals) -> Transition {
    match current {
        AttesterState::New => {
            if signals.has_coinbase {
                Transition::to(AttesterState::RollupEntryQueue)
            } else if signals.in_provider_queue {
                Transition::to(AttesterState::InProviderQueue)
            } else {
                Transition::stay(current)
            }
        }
        AttesterState::InProviderQueue => {
            if signals.has_coinbase {
                Transition::to(AttesterState::RollupEntryQueue)
            } else {
                Transition::stay(current)
            }
        }
        AttesterState::RollupEntryQueue => {
            if signals.chain_status != ChainStatus::None {
                Transition::to(AttesterState::Active)
            } else if !signals.has_coinbase {
                Transition::stay_with(current, Anomaly::CoinbaseLostWhileQueued)
            } else {
                Transition::stay(current)
            }
        }
        AttesterState::Active => {
            if !signals.has_coinbase {
                Transition::stay_with(current, Anomaly::CoinbaseLostWhileActive)
            } else {
                Transition::stay(current)
            }
        }
        // Not reached by the table; reinstatement is an external action.
        AttesterState::NoLongerActive => Transition::stay(current),
    }
}

/// Returns `true` if an attester that was `Active` with a coinbase should be
/// demoted to `NoLongerActive` given its latest chain status.
pub fn is_exit_status(status: ChainStatus) -> bool {
    matches!(
        status,
        ChainStatus::None | ChainStatus::Zombie | ChainStatus::Exiting
    )
}

/// Pure membership predicate over the latest queue snapshot.
///
/// Returns `false` (not an error) when no queue data has been loaded yet.
pub fn queue_contains(queue: &[String], address: &str) -> bool {
    queue.iter().any(|q| q.eq_ignore_ascii_case(address))
}

// ─── Records & registry ──────────────────────────────────────────────────────

/// One tracked attester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttesterRecord {
    pub address: String,
    pub state: AttesterState,
    /// Latest known on-chain view, if any.
    pub chain_view: Option<AttesterView>,
}

/// A committed state change, reported so the caller can dispatch hooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateChange {
    pub attester: String,
    pub from: AttesterState,
    pub to: AttesterState,
}

/// Owns every [`AttesterRecord`] for one network and applies the transition
/// function once per poll per attester. Records are never deleted; an exited
/// attester is kept as `NoLongerActive`.
pub struct LifecycleRegistry {
    network: String,
    records: HashMap<String, AttesterRecord>,
}

impl LifecycleRegistry {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            network: network.into(),
            records: HashMap::new(),
        }
    }

    /// Feed one poll cycle's signals for one attester.
    ///
    /// Creates the record on first observation, advances it, applies the
    /// external exit demotion, and returns the committed change (if any).
    pub fn observe(
        &mut self,
        address: &str,
        signals: &Signals,
        view: Option<AttesterView>,
    ) -> Option<StateChange> {
        let key = normalize_address(address);
        let record = self.records.entry(key).or_insert_with(|| {
            let state = initial_state(signals.has_coinbase);
            tracing::info!(
                network = %self.network,
                attester = %address,
                state = %state,
                "Tracking new attester"
            );
            AttesterRecord {
                address: address.to_string(),
                state,
                chain_view: None,
            }
        });

        let previous = record.state;
        let transition = advance(previous, signals);
        let mut next = transition.next;

        // Exit demotion sits outside the table: only a previously active
        // attester with a coinbase can become NoLongerActive.
        if previous == AttesterState::Active
            && signals.has_coinbase
            && is_exit_status(signals.chain_status)
        {
            next = AttesterState::NoLongerActive;
        }

        match transition.anomaly {
            Some(Anomaly::CoinbaseLostWhileQueued) => tracing::warn!(
                network = %self.network,
                attester = %record.address,
                "Coinbase mapping lost while waiting in the entry queue"
            ),
            Some(Anomaly::CoinbaseLostWhileActive) => tracing::error!(
                network = %self.network,
                attester = %record.address,
                "Coinbase mapping lost while ACTIVE — manual inspection required"
            ),
            None => {}
        }

        record.chain_view = view;
        if next == previous {
            return None;
        }
        record.state = next;
        tracing::info!(
            network = %self.network,
            attester = %record.address,
            from = %previous,
            to = %next,
            "Attester state change"
        );
        Some(StateChange {
            attester: record.address.clone(),
            from: previous,
            to: next,
        })
    }

    /// Look up a record by address (case-insensitive).
    pub fn get(&self, address: &str) -> Option<&AttesterRecord> {
        self.records.get(&normalize_address(address))
    }

    /// Iterate all tracked records.
    pub fn records(&self) -> impl Iterator<Item = &AttesterRecord> {
        self.records.values()
    }

    /// Number of tracked attesters.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count of records currently in `state`.
    pub fn count_in(&self, state: AttesterState) -> usize {
        self.records.values().filter(|r| r.state == state).count()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
