//! EVM collaborator traits: chain log reader and on-chain state reader.
//!
//! Uses JSON-RPC shapes (`eth_getLogs`, `eth_getBlockByNumber`) but leaves
//! the transport to the implementor; the engine only needs range queries and
//! decoded topic/data words.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use stakewatch_core::error::MonitorError;
use stakewatch_core::lifecycle::AttesterView;

/// A raw EVM log as returned by `eth_getLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    #[serde(rename = "data")]
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "blockHash")]
    pub block_hash: String,
    #[serde(rename = "transactionHash")]
    pub tx_hash: String,
    #[serde(rename = "removed")]
    pub removed: Option<bool>,
}

impl RawLog {
    /// Returns the block number as u64.
    pub fn block_number_u64(&self) -> u64 {
        parse_hex_u64(&self.block_number)
    }

    /// Returns `true` if this log was removed by a reorg.
    pub fn is_removed(&self) -> bool {
        self.removed.unwrap_or(false)
    }
}

/// A minimal block header — number, hash, and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub number: u64,
    pub hash: String,
    /// Unix timestamp (seconds since epoch).
    pub timestamp: i64,
}

/// Log query filter: one emitting contract, one event signature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogFilter {
    /// Emitting contract address.
    pub address: String,
    /// Event signature hash (topic[0]).
    pub topic0: String,
}

/// Trait for fetching EVM chain data from a JSON-RPC provider.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn get_block_number(&self) -> Result<u64, MonitorError>;
    async fn get_block(&self, number: u64) -> Result<Option<BlockHeader>, MonitorError>;
    async fn get_logs(
        &self,
        from: u64,
        to: u64,
        filter: &LogFilter,
    ) -> Result<Vec<RawLog>, MonitorError>;
}

/// Trait for reading staking/rollup state.
#[async_trait]
pub trait StateReader: Send + Sync {
    /// Attesters currently waiting in the given provider's queue.
    async fn provider_queue(&self, provider_id: u64) -> Result<Vec<String>, MonitorError>;

    /// All attesters waiting in the rollup's global entry queue.
    async fn rollup_queue(&self) -> Result<Vec<String>, MonitorError>;

    /// The rollup's view of one attester, `None` if unknown to it.
    async fn attester_view(&self, address: &str) -> Result<Option<AttesterView>, MonitorError>;
}

// ─── Decoding helpers ────────────────────────────────────────────────────────

/// Parse a hex-encoded string (with or without `0x`) to u64.
pub fn parse_hex_u64(s: &str) -> u64 {
    let s = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(s, 16).unwrap_or(0)
}

/// Extract the address packed into a 32-byte topic/data word.
pub fn word_to_address(word: &str) -> Option<String> {
    let hex = word.strip_prefix("0x").unwrap_or(word);
    if hex.len() < 40 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    Some(format!("0x{}", &hex[hex.len() - 40..]))
}

/// Decode a coinbase-binding event into `(attester, coinbase)`.
///
/// The attester is the first indexed parameter (topic[1]); the coinbase is
/// the first data word, or topic[2] on registries that index it too.
pub fn decode_coinbase_binding(log: &RawLog) -> Option<(String, String)> {
    let attester = word_to_address(log.topics.get(1)?)?;
    let coinbase = first_data_word(&log.data)
        .and_then(|w| word_to_address(&w))
        .or_else(|| log.topics.get(2).and_then(|t| word_to_address(t)))?;
    Some((attester, coinbase))
}

fn first_data_word(data: &str) -> Option<String> {
    let hex = data.strip_prefix("0x").unwrap_or(data);
    if hex.len() < 64 {
        return None;
    }
    Some(format!("0x{}", &hex[..64]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn padded(addr: &str) -> String {
        let hex = addr.strip_prefix("0x").unwrap_or(addr);
        format!("0x{:0>64}", hex)
    }

    #[test]
    fn parse_hex_u64_basic() {
        assert_eq!(parse_hex_u64("0x1"), 1);
        assert_eq!(parse_hex_u64("0xff"), 255);
        assert_eq!(parse_hex_u64("1234"), 0x1234);
    }

    #[test]
    fn word_to_address_unpads() {
        let word = padded("0xabc0000000000000000000000000000000000001");
        assert_eq!(
            word_to_address(&word).unwrap(),
            "0xabc0000000000000000000000000000000000001"
        );
    }

    #[test]
    fn word_to_address_rejects_garbage() {
        assert!(word_to_address("0x12").is_none());
        assert!(word_to_address("not-hex-zzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz").is_none());
    }

    #[test]
    fn decode_binding_from_topics_and_data() {
        let log = RawLog {
            address: "0xregistry".into(),
            topics: vec![
                "0xtopic0".into(),
                padded("0xaaa0000000000000000000000000000000000001"),
            ],
            data: padded("0xccc0000000000000000000000000000000000002"),
            block_number: "0x64".into(),
            block_hash: "0xbh".into(),
            tx_hash: "0xtx".into(),
            removed: None,
        };
        let (attester, coinbase) = decode_coinbase_binding(&log).unwrap();
        assert_eq!(attester, "0xaaa0000000000000000000000000000000000001");
        assert_eq!(coinbase, "0xccc0000000000000000000000000000000000002");
        assert_eq!(log.block_number_u64(), 100);
    }

    #[test]
    fn decode_binding_falls_back_to_indexed_coinbase() {
        let log = RawLog {
            address: "0xregistry".into(),
            topics: vec![
                "0xtopic0".into(),
                padded("0xaaa0000000000000000000000000000000000001"),
                padded("0xccc0000000000000000000000000000000000002"),
            ],
            data: "0x".into(),
            block_number: "0x64".into(),
            block_hash: "0xbh".into(),
            tx_hash: "0xtx".into(),
            removed: None,
        };
        let (_, coinbase) = decode_coinbase_binding(&log).unwrap();
        assert_eq!(coinbase, "0xccc0000000000000000000000000000000000002");
    }

    #[test]
    fn decode_binding_rejects_missing_attester() {
        let log = RawLog {
            address: "0xregistry".into(),
            topics: vec!["0xtopic0".into()],
            data: "0x".into(),
            block_number: "0x64".into(),
            block_hash: "0xbh".into(),
            tx_hash: "0xtx".into(),
            removed: None,
        };
        assert!(decode_coinbase_binding(&log).is_none());
    }
}
