//! Handshake registry
//!
//! Tracks `HANDSHAKE` system memos and answers, per (channel, counterparty),
//! whether we published our key and which key they published to us.
//! Lookups are memoized; ingesting new history drops the cached entries it
//! could change, so a negative answer is never permanent.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::debug;

use crate::record::MemoTransaction;
use crate::system::HANDSHAKE_MEMO_TYPE;

/// Handshake state between a channel address and one counterparty
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandshakeStatus {
    /// Channel address sent its key to the counterparty
    pub sent: bool,
    /// Latest key the counterparty sent to the channel address
    pub received_key: Option<String>,
}

impl HandshakeStatus {
    /// Both sides have published keys; a shared secret can be derived.
    pub fn is_complete(&self) -> bool {
        self.sent && self.received_key.is_some()
    }
}

/// Per-counterparty handshake overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandshakeSummary {
    pub counterparty: String,
    pub sent_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub received_key: Option<String>,
    pub encryption_ready: bool,
}

#[derive(Debug, Clone)]
struct HandshakeRecord {
    hash: String,
    account: String,
    destination: String,
    public_key: String,
    ledger_sequence: u64,
    timestamp: DateTime<Utc>,
}

/// Thread-safe handshake lookup over ingested history
#[derive(Debug, Default)]
pub struct HandshakeRegistry {
    records: RwLock<Vec<HandshakeRecord>>,
    cache: DashMap<(String, String), HandshakeStatus>,
}

impl HandshakeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_transactions(transactions: &[MemoTransaction]) -> Self {
        let registry = Self::new();
        registry.ingest(transactions);
        registry
    }

    /// Add the handshake memos among `transactions`. Returns how many were new.
    pub fn ingest(&self, transactions: &[MemoTransaction]) -> usize {
        let mut records = self.records.write();
        let mut added = 0;

        for tx in transactions {
            if tx.memo.memo_type != HANDSHAKE_MEMO_TYPE {
                continue;
            }
            if records.iter().any(|r| r.hash == tx.hash) {
                continue;
            }
            records.push(HandshakeRecord {
                hash: tx.hash.clone(),
                account: tx.account.clone(),
                destination: tx.destination.clone(),
                public_key: tx.memo.data.trim().to_string(),
                ledger_sequence: tx.ledger_sequence,
                timestamp: tx.timestamp,
            });
            self.cache
                .remove(&(tx.account.clone(), tx.destination.clone()));
            self.cache
                .remove(&(tx.destination.clone(), tx.account.clone()));
            added += 1;
        }

        if added > 0 {
            debug!(added, total = records.len(), "Ingested handshakes");
        }
        added
    }

    /// Number of distinct handshake memos known.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Handshake state of `channel_address` with `counterparty`.
    pub fn get_handshake(&self, channel_address: &str, counterparty: &str) -> HandshakeStatus {
        let key = (channel_address.to_string(), counterparty.to_string());
        if let Some(cached) = self.cache.get(&key) {
            return cached.clone();
        }

        // Hold the read guard until the entry is cached so a concurrent
        // ingest cannot invalidate before we insert.
        let records = self.records.read();
        let status = Self::compute(&records, channel_address, counterparty);
        if !status.is_complete() {
            debug!(
                channel = channel_address,
                counterparty,
                sent = status.sent,
                received = status.received_key.is_some(),
                "Handshake incomplete"
            );
        }
        self.cache.insert(key, status.clone());
        drop(records);
        status
    }

    fn compute(
        records: &[HandshakeRecord],
        channel_address: &str,
        counterparty: &str,
    ) -> HandshakeStatus {
        let sent = records
            .iter()
            .any(|r| r.account == channel_address && r.destination == counterparty);

        let received_key = records
            .iter()
            .filter(|r| r.account == counterparty && r.destination == channel_address)
            .max_by_key(|r| (r.timestamp, r.ledger_sequence))
            .map(|r| r.public_key.clone());

        HandshakeStatus { sent, received_key }
    }

    /// Handshake overview for every counterparty of `channel_address`.
    pub fn summaries(&self, channel_address: &str) -> Vec<HandshakeSummary> {
        let counterparties: std::collections::BTreeSet<String> = {
            let records = self.records.read();
            records
                .iter()
                .filter_map(|r| {
                    if r.account == channel_address {
                        Some(r.destination.clone())
                    } else if r.destination == channel_address {
                        Some(r.account.clone())
                    } else {
                        None
                    }
                })
                .collect()
        };

        counterparties
            .into_iter()
            .map(|counterparty| {
                let (sent_at, received_at) = {
                    let records = self.records.read();
                    let sent_at = records
                        .iter()
                        .filter(|r| r.account == channel_address && r.destination == counterparty)
                        .map(|r| r.timestamp)
                        .min();
                    let received_at = records
                        .iter()
                        .filter(|r| r.account == counterparty && r.destination == channel_address)
                        .map(|r| r.timestamp)
                        .min();
                    (sent_at, received_at)
                };
                let status = self.get_handshake(channel_address, &counterparty);
                HandshakeSummary {
                    encryption_ready: status.is_complete(),
                    received_key: status.received_key,
                    counterparty,
                    sent_at,
                    received_at,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod handshake_tests {
    use super::*;
    use crate::record::Memo;
    use chrono::TimeZone;

    fn handshake(hash: &str, from: &str, to: &str, key: &str, minute: u32, seq: u64) -> MemoTransaction {
        MemoTransaction {
            hash: hash.into(),
            account: from.into(),
            destination: to.into(),
            memo: Memo::new("user", HANDSHAKE_MEMO_TYPE, key),
            ledger_sequence: seq,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, minute, 0).unwrap(),
            delivered_amount: 0.0,
        }
    }

    #[test]
    fn test_empty_history() {
        let registry = HandshakeRegistry::new();
        let status = registry.get_handshake("rA", "rB");
        assert_eq!(status, HandshakeStatus::default());
        assert!(!status.is_complete());
    }

    #[test]
    fn test_directions() {
        let registry = HandshakeRegistry::from_transactions(&[
            handshake("1", "rA", "rB", "EDA", 1, 1),
            handshake("2", "rB", "rA", "EDB", 2, 2),
        ]);
        let a = registry.get_handshake("rA", "rB");
        assert!(a.sent);
        assert_eq!(a.received_key.as_deref(), Some("EDB"));
        assert!(a.is_complete());

        let b = registry.get_handshake("rB", "rA");
        assert_eq!(b.received_key.as_deref(), Some("EDA"));
        assert!(!registry.get_handshake("rA", "rC").sent);
    }

    #[test]
    fn test_latest_received_key_wins() {
        let registry = HandshakeRegistry::from_transactions(&[
            handshake("2", "rB", "rA", "EDNEW", 5, 20),
            handshake("1", "rB", "rA", "EDOLD", 1, 10),
            handshake("3", "rB", "rA", "EDSAMEMINUTE", 5, 21),
        ]);
        assert_eq!(
            registry.get_handshake("rA", "rB").received_key.as_deref(),
            Some("EDSAMEMINUTE"),
            "ties on timestamp fall back to ledger sequence"
        );
    }

    #[test]
    fn test_ingest_invalidates_negative_cache() {
        let registry = HandshakeRegistry::from_transactions(&[handshake("1", "rA", "rB", "EDA", 1, 1)]);
        assert!(!registry.get_handshake("rA", "rB").is_complete());

        assert_eq!(registry.ingest(&[handshake("2", "rB", "rA", "EDB", 2, 2)]), 1);
        assert!(registry.get_handshake("rA", "rB").is_complete());
    }

    #[test]
    fn test_duplicate_hash_ignored() {
        let tx = handshake("1", "rA", "rB", "EDA", 1, 1);
        let registry = HandshakeRegistry::from_transactions(&[tx.clone()]);
        assert_eq!(registry.ingest(&[tx]), 0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_summaries() {
        let registry = HandshakeRegistry::from_transactions(&[
            handshake("1", "rA", "rB", "EDA", 1, 1),
            handshake("2", "rB", "rA", "EDB", 2, 2),
            handshake("3", "rC", "rA", "EDC", 3, 3),
        ]);
        let summaries = registry.summaries("rA");
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].counterparty, "rB");
        assert!(summaries[0].encryption_ready);
        assert_eq!(summaries[1].counterparty, "rC");
        assert!(!summaries[1].encryption_ready);
        assert!(summaries[1].sent_at.is_none());
        assert!(summaries[1].received_at.is_some());
    }
}
