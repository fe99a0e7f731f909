//! Tamper-evident audit chain.
//!
//! Each entry's hash covers the previous entry's hash plus the canonical
//! payload, so any in-place edit breaks every later link. Verification is
//! a pure function over an entry slice; storage is someone else's problem.

use sha2::{Digest, Sha256};

/// Hash of the (nonexistent) entry before the first one.
pub const GENESIS_HASH: &str = "0000000000000000000000000000000000000000000000000000000000000000";

/// One link of the chain, as read back from storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEntry {
    pub correlation_id: String,
    pub payload: String,
    pub prev_hash: String,
    pub hash: String,
}

/// `hex(SHA-256(prev_hash || payload))`. The payload must already be in
/// canonical form (serialized once at append time and never re-encoded).
#[must_use]
pub fn chain_hash(prev_hash: &str, payload: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(payload.as_bytes());
    hex::encode(hasher.finalize())
}

/// Walks the chain and returns the index of the first broken entry, i.e.
/// the first entry whose `prev_hash` does not match its predecessor or
/// whose own hash does not recompute.
pub fn verify_chain(entries: &[ChainEntry]) -> Result<(), usize> {
    let mut expected_prev = GENESIS_HASH;

    for (idx, entry) in entries.iter().enumerate() {
        if entry.prev_hash != expected_prev {
            return Err(idx);
        }
        if chain_hash(&entry.prev_hash, &entry.payload) != entry.hash {
            return Err(idx);
        }
        expected_prev = &entry.hash;
    }

    Ok(())
}

/// Builds the next link on top of `prev_hash`.
#[must_use]
pub fn next_entry(prev_hash: &str, correlation_id: String, payload: String) -> ChainEntry {
    let hash = chain_hash(prev_hash, &payload);
    ChainEntry {
        correlation_id,
        payload,
        prev_hash: prev_hash.to_string(),
        hash,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_chain(payloads: &[&str]) -> Vec<ChainEntry> {
        let mut entries: Vec<ChainEntry> = Vec::new();
        for (i, payload) in payloads.iter().enumerate() {
            let prev = entries.last().map_or(GENESIS_HASH, |e| e.hash.as_str());
            entries.push(next_entry(prev, format!("corr-{i}"), (*payload).to_string()));
        }
        entries
    }

    #[test]
    fn empty_chain_verifies() {
        assert_eq!(verify_chain(&[]), Ok(()));
    }

    #[test]
    fn intact_chain_verifies() {
        let entries = build_chain(&["a", "b", "c", "d"]);
        assert_eq!(verify_chain(&entries), Ok(()));
    }

    #[test]
    fn edited_payload_breaks_at_that_index() {
        let mut entries = build_chain(&["a", "b", "c"]);
        entries[1].payload = "tampered".to_string();
        assert_eq!(verify_chain(&entries), Err(1));
    }

    #[test]
    fn rewritten_entry_breaks_the_next_link() {
        let mut entries = build_chain(&["a", "b", "c"]);
        // Recompute entry 1 consistently with a forged payload; the forgery
        // is then detected at entry 2, whose prev_hash no longer matches.
        let forged = next_entry(&entries[0].hash, "corr-1".to_string(), "forged".to_string());
        entries[1] = forged;
        assert_eq!(verify_chain(&entries), Err(2));
    }

    #[test]
    fn truncation_from_the_front_is_detected() {
        let entries = build_chain(&["a", "b"]);
        assert_eq!(verify_chain(&entries[1..]), Err(0));
    }
}
