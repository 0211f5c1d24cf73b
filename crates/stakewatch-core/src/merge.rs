//! The coinbase merge algorithm.
//!
//! Merges freshly scraped mappings into an existing mapping set under a
//! conflict-aware policy. Per attester key:
//!
//! 1. Absent from existing → insert (counted as new).
//! 2. Same coinbase in both → keep the higher block number (counted as
//!    updated only when the incoming block is strictly newer).
//! 3. Existing is the zero-address placeholder, incoming is real → incoming
//!    wins (counted as updated).
//! 4. Existing is real, incoming is the placeholder → existing wins.
//! 5. Both real and different → fatal [`MonitorError::Conflict`]. One
//!    attester maps to one coinbase, permanently; a violation means a missed
//!    reorg, a misconfigured filter, or operator error, and a human decides.
//!
//! The merge is pure: it never mutates its inputs, and on conflict the caller
//! holds the untouched existing set. Incoming mappings are applied in slice
//! order, so callers feeding block-ascending scrape results get deterministic
//! last-write-wins behavior within a batch.

use std::collections::HashMap;

use crate::error::MonitorError;
use crate::types::CoinbaseMapping;

/// Result of merging incoming mappings into an existing set.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merged mapping set, keyed by lower-cased attester address.
    pub merged: HashMap<String, CoinbaseMapping>,
    /// Attesters seen for the first time.
    pub new_mappings: u64,
    /// Attesters whose mapping advanced (newer block or placeholder replaced).
    pub updated_mappings: u64,
    /// Every mapping that was inserted or replaced, in application order.
    pub changed: Vec<CoinbaseMapping>,
}

/// Merge `incoming` into `existing`, returning the merged set and counters.
///
/// `existing` is borrowed and never mutated; on conflict the error carries
/// both coinbases and block numbers for operator inspection.
pub fn merge_mappings(
    existing: &HashMap<String, CoinbaseMapping>,
    incoming: &[CoinbaseMapping],
) -> Result<MergeOutcome, MonitorError> {
    let mut merged = existing.clone();
    let mut new_mappings = 0u64;
    let mut updated_mappings = 0u64;
    let mut changed = Vec::new();

    for candidate in incoming {
        let key = candidate.key();
        match merged.get(&key) {
            None => {
                new_mappings += 1;
                changed.push(candidate.clone());
                merged.insert(key, candidate.clone());
            }
            Some(current) => {
                if current.same_coinbase(candidate) {
                    if candidate.block_number > current.block_number {
                        updated_mappings += 1;
                        changed.push(candidate.clone());
                        merged.insert(key, candidate.clone());
                    }
                } else if current.is_placeholder() {
                    // Placeholder carries no information; the real address wins.
                    updated_mappings += 1;
                    changed.push(candidate.clone());
                    merged.insert(key, candidate.clone());
                } else if candidate.is_placeholder() {
                    // A late placeholder never displaces a real coinbase.
                } else {
                    return Err(MonitorError::Conflict {
                        attester: current.attester_address.clone(),
                        existing_coinbase: current.coinbase_address.clone(),
                        existing_block: current.block_number,
                        incoming_coinbase: candidate.coinbase_address.clone(),
                        incoming_block: candidate.block_number,
                    });
                }
            }
        }
    }

    Ok(MergeOutcome {
        merged,
        new_mappings,
        updated_mappings,
        changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZERO_ADDRESS;

    fn mapping(attester: &str, coinbase: &str, block: u64) -> CoinbaseMapping {
        CoinbaseMapping {
            attester_address: attester.into(),
            coinbase_address: coinbase.into(),
            block_number: block,
            block_hash: format!("0xblock{block}"),
            timestamp: (block * 12) as i64,
        }
    }

    fn existing_of(mappings: &[CoinbaseMapping]) -> HashMap<String, CoinbaseMapping> {
        mappings.iter().map(|m| (m.key(), m.clone())).collect()
    }

    #[test]
    fn insert_into_empty() {
        let outcome = merge_mappings(&HashMap::new(), &[mapping("0xA1", "0xC1", 100)]).unwrap();
        assert_eq!(outcome.new_mappings, 1);
        assert_eq!(outcome.updated_mappings, 0);
        assert_eq!(outcome.merged.len(), 1);
        assert_eq!(outcome.merged["0xa1"].coinbase_address, "0xC1");
    }

    #[test]
    fn same_coinbase_newer_block_wins() {
        let existing = existing_of(&[mapping("0xA1", "0xC1", 100)]);
        let outcome = merge_mappings(&existing, &[mapping("0xA1", "0xC1", 150)]).unwrap();
        assert_eq!(outcome.updated_mappings, 1);
        assert_eq!(outcome.merged["0xa1"].block_number, 150);
    }

    #[test]
    fn same_coinbase_older_block_is_noop() {
        let existing = existing_of(&[mapping("0xA1", "0xC1", 150)]);
        let outcome = merge_mappings(&existing, &[mapping("0xA1", "0xC1", 100)]).unwrap();
        assert_eq!(outcome.updated_mappings, 0);
        assert!(outcome.changed.is_empty());
        assert_eq!(outcome.merged["0xa1"].block_number, 150);
    }

    #[test]
    fn same_coinbase_equal_block_is_noop() {
        let existing = existing_of(&[mapping("0xA1", "0xC1", 100)]);
        let outcome = merge_mappings(&existing, &[mapping("0xA1", "0xC1", 100)]).unwrap();
        assert_eq!(outcome.updated_mappings, 0);
    }

    #[test]
    fn placeholder_replaced_by_real_coinbase() {
        let existing = existing_of(&[mapping("0xA1", ZERO_ADDRESS, 100)]);
        let outcome = merge_mappings(&existing, &[mapping("0xA1", "0xC2", 150)]).unwrap();
        assert_eq!(outcome.updated_mappings, 1);
        assert_eq!(outcome.merged["0xa1"].coinbase_address, "0xC2");
        assert_eq!(outcome.merged["0xa1"].block_number, 150);
    }

    #[test]
    fn real_coinbase_survives_late_placeholder() {
        let existing = existing_of(&[mapping("0xA1", "0xC1", 100)]);
        let outcome = merge_mappings(&existing, &[mapping("0xA1", ZERO_ADDRESS, 150)]).unwrap();
        assert_eq!(outcome.new_mappings, 0);
        assert_eq!(outcome.updated_mappings, 0);
        assert_eq!(outcome.merged["0xa1"].coinbase_address, "0xC1");
        assert_eq!(outcome.merged["0xa1"].block_number, 100);
    }

    #[test]
    fn divergent_coinbases_conflict() {
        let existing = existing_of(&[mapping("0xA1", "0xC1", 100)]);
        let err = merge_mappings(&existing, &[mapping("0xA1", "0xC9", 150)]).unwrap_err();
        match err {
            MonitorError::Conflict {
                attester,
                existing_coinbase,
                existing_block,
                incoming_coinbase,
                incoming_block,
            } => {
                assert_eq!(attester, "0xA1");
                assert_eq!(existing_coinbase, "0xC1");
                assert_eq!(existing_block, 100);
                assert_eq!(incoming_coinbase, "0xC9");
                assert_eq!(incoming_block, 150);
            }
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[test]
    fn conflict_detection_is_symmetric() {
        let a = mapping("0xA1", "0xC1", 100);
        let b = mapping("0xA1", "0xC9", 150);

        let ab = merge_mappings(&existing_of(&[a.clone()]), std::slice::from_ref(&b));
        let ba = merge_mappings(&existing_of(&[b.clone()]), std::slice::from_ref(&a));
        assert!(ab.is_err() && ba.is_err());

        let values = |e: MonitorError| match e {
            MonitorError::Conflict {
                existing_coinbase,
                incoming_coinbase,
                ..
            } => {
                let mut v = [existing_coinbase, incoming_coinbase];
                v.sort();
                v
            }
            other => panic!("expected Conflict, got {other:?}"),
        };
        assert_eq!(values(ab.unwrap_err()), values(ba.unwrap_err()));
    }

    #[test]
    fn merge_order_independent_without_conflicts() {
        let set_a = [mapping("0xA1", "0xC1", 100), mapping("0xA2", "0xC2", 110)];
        let set_b = [mapping("0xA1", "0xC1", 150), mapping("0xA3", "0xC3", 120)];

        let ab = merge_mappings(&merge_mappings(&HashMap::new(), &set_a).unwrap().merged, &set_b)
            .unwrap()
            .merged;
        let ba = merge_mappings(&merge_mappings(&HashMap::new(), &set_b).unwrap().merged, &set_a)
            .unwrap()
            .merged;
        assert_eq!(ab, ba);
    }

    #[test]
    fn attester_key_case_insensitive() {
        let existing = existing_of(&[mapping("0xabc0000000000000000000000000000000000001", "0xC1", 100)]);
        let incoming = [mapping("0xABC0000000000000000000000000000000000001", "0xC1", 150)];
        let outcome = merge_mappings(&existing, &incoming).unwrap();
        assert_eq!(outcome.merged.len(), 1);
        assert_eq!(outcome.updated_mappings, 1);
    }

    #[test]
    fn existing_set_untouched_on_conflict() {
        let existing = existing_of(&[mapping("0xA1", "0xC1", 100)]);
        let before = existing.clone();
        let _ = merge_mappings(&existing, &[mapping("0xA1", "0xC9", 150)]);
        assert_eq!(existing, before);
    }
}
