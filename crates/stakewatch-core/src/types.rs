//! Shared types for the reconciliation pipeline.

use serde::{Deserialize, Serialize};

/// The zero address — emitted by the registry while a reward-split contract
/// is still a placeholder. Treated as "unset", never as an authoritative value.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// Lower-case an address for use as a map key or comparison operand.
pub fn normalize_address(addr: &str) -> String {
    addr.to_ascii_lowercase()
}

/// Returns `true` if `addr` is the zero-address sentinel.
pub fn is_zero_address(addr: &str) -> bool {
    addr.eq_ignore_ascii_case(ZERO_ADDRESS)
}

// ─── CoinbaseMapping ─────────────────────────────────────────────────────────

/// One observed fact: this attester's block-reward split goes to this coinbase.
///
/// A mapping is immutable once created; a later observation for the same
/// attester supersedes it (it is never mutated in place).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinbaseMapping {
    /// Attester address (`0x…`).
    pub attester_address: String,
    /// Coinbase (reward-split) address (`0x…`).
    pub coinbase_address: String,
    /// Block in which the binding event was observed.
    pub block_number: u64,
    /// Hash of that block (`0x…`).
    pub block_hash: String,
    /// Unix timestamp of that block (seconds since epoch).
    pub timestamp: i64,
}

impl CoinbaseMapping {
    /// Map key for this mapping (lower-cased attester address).
    pub fn key(&self) -> String {
        normalize_address(&self.attester_address)
    }

    /// Returns `true` if the coinbase is the zero-address placeholder.
    pub fn is_placeholder(&self) -> bool {
        is_zero_address(&self.coinbase_address)
    }

    /// Returns `true` if both mappings name the same coinbase (case-insensitive).
    pub fn same_coinbase(&self, other: &CoinbaseMapping) -> bool {
        self.coinbase_address
            .eq_ignore_ascii_case(&other.coinbase_address)
    }
}

// ─── WatchSet ────────────────────────────────────────────────────────────────

/// The set of attester addresses this monitor cares about.
///
/// Membership checks are case-insensitive; an empty watch-set matches nothing
/// (an unconfigured monitor must not scrape the whole registry).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatchSet {
    addresses: Vec<String>,
}

impl WatchSet {
    pub fn new(addresses: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            addresses: addresses
                .into_iter()
                .map(|a| normalize_address(&a.into()))
                .collect(),
        }
    }

    /// Returns `true` if `address` is watched.
    pub fn contains(&self, address: &str) -> bool {
        self.addresses
            .iter()
            .any(|a| a.eq_ignore_ascii_case(address))
    }

    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Iterate the watched addresses (already lower-cased).
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.addresses.iter().map(String::as_str)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
