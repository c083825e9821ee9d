//! Ledger collaborator interfaces
//!
//! The engine never signs or submits. It prepares `PaymentRequest`s for a
//! `LedgerSubmitter` and consumes raw records from a `HistoryStore`.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{ProtocolConfig, SUCCESS_RESULT_CODE};
use crate::error::Result;
use crate::record::{EncodedMemo, TransactionRecord};
use crate::system::is_system_memo_type;

/// One payment carrying one memo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentRequest {
    pub source: String,
    pub destination: String,
    pub memo: EncodedMemo,
    /// Tokens attached to the payment
    pub token_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub hash: String,
    pub result_code: String,
}

impl SubmissionResult {
    /// True when the ledger reported `success_code`, normally
    /// `ProtocolConfig::success_code`.
    pub fn is_success(&self, success_code: &str) -> bool {
        self.result_code == success_code
    }
}

/// Signs and submits payments. Retries and timeouts belong to the implementor.
pub trait LedgerSubmitter: Send + Sync {
    fn submit(&self, request: &PaymentRequest) -> Result<SubmissionResult>;
}

/// Criteria for a history query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryFilter {
    /// Only records exchanged with this address
    pub counterparty: Option<String>,
    /// Only records at or above this ledger
    pub min_ledger: Option<u64>,
    /// Most recent N records
    pub limit: Option<usize>,
}

/// Source of raw transaction records for an account.
pub trait HistoryStore: Send + Sync {
    fn query(&self, account: &str, filter: &HistoryFilter) -> Vec<TransactionRecord>;
}

// ============================================================================
// Token Requirements
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AddressType {
    Node,
    Remembrancer,
    Issuer,
    Other,
}

/// Tokens that must accompany each memo payment to a destination
#[derive(Debug, Clone, Default)]
pub struct TokenRequirements {
    node_address: Option<String>,
    remembrancer_address: Option<String>,
    issuer_address: Option<String>,
}

impl TokenRequirements {
    pub fn from_config(config: &ProtocolConfig) -> Self {
        Self {
            node_address: config.node_address.clone(),
            remembrancer_address: config.remembrancer_address.clone(),
            issuer_address: config.issuer_address.clone(),
        }
    }

    pub fn address_type(&self, address: &str) -> AddressType {
        let is = |candidate: &Option<String>| candidate.as_deref() == Some(address);
        if is(&self.node_address) {
            AddressType::Node
        } else if is(&self.remembrancer_address) {
            AddressType::Remembrancer
        } else if is(&self.issuer_address) {
            AddressType::Issuer
        } else {
            AddressType::Other
        }
    }

    /// Required tokens per memo payment. System memos are always free.
    pub fn requirement(&self, address: &str, memo_type: &str) -> f64 {
        if is_system_memo_type(memo_type) {
            return 0.0;
        }
        match self.address_type(address) {
            AddressType::Node | AddressType::Remembrancer => 1.0,
            AddressType::Issuer | AddressType::Other => 0.0,
        }
    }
}

// ============================================================================
// In-memory Ledger
// ============================================================================

/// In-memory history that also accepts submissions.
///
/// Every submitted payment is recorded as a successful transaction on its
/// own ledger sequence.
#[derive(Debug)]
pub struct MemoryHistory {
    records: RwLock<Vec<TransactionRecord>>,
    next_sequence: AtomicU64,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            next_sequence: AtomicU64::new(1),
        }
    }

    pub fn with_records(records: Vec<TransactionRecord>) -> Self {
        let next = records.iter().map(|r| r.ledger_sequence).max().unwrap_or(0) + 1;
        Self {
            records: RwLock::new(records),
            next_sequence: AtomicU64::new(next),
        }
    }

    pub fn push(&self, record: TransactionRecord) {
        self.next_sequence
            .fetch_max(record.ledger_sequence + 1, Ordering::SeqCst);
        self.records.write().push(record);
    }

    pub fn all(&self) -> Vec<TransactionRecord> {
        self.records.read().clone()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl Default for MemoryHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for MemoryHistory {
    fn query(&self, account: &str, filter: &HistoryFilter) -> Vec<TransactionRecord> {
        let records = self.records.read();
        let mut matching: Vec<TransactionRecord> = records
            .iter()
            .filter(|r| r.account == account || r.destination == account)
            .filter(|r| match &filter.counterparty {
                Some(other) => {
                    (r.account == account && &r.destination == other)
                        || (r.destination == account && &r.account == other)
                }
                None => true,
            })
            .filter(|r| filter.min_ledger.map_or(true, |min| r.ledger_sequence >= min))
            .cloned()
            .collect();

        matching.sort_by_key(|r| r.ledger_sequence);
        if let Some(limit) = filter.limit {
            let skip = matching.len().saturating_sub(limit);
            matching.drain(..skip);
        }
        matching
    }
}

impl LedgerSubmitter for MemoryHistory {
    fn submit(&self, request: &PaymentRequest) -> Result<SubmissionResult> {
        let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
        let mut hasher = Sha256::new();
        hasher.update(request.source.as_bytes());
        hasher.update(request.destination.as_bytes());
        hasher.update(request.memo.data_hex.as_bytes());
        hasher.update(sequence.to_be_bytes());
        let hash = hex::encode_upper(hasher.finalize());

        let mut record = TransactionRecord::from_encoded(
            hash.clone(),
            &request.source,
            &request.destination,
            &request.memo,
            sequence,
            Utc::now(),
        );
        if request.token_amount > 0.0 {
            record.delivered_amount = Some(request.token_amount.to_string());
        }
        self.records.write().push(record);

        Ok(SubmissionResult {
            hash,
            result_code: SUCCESS_RESULT_CODE.to_string(),
        })
    }
}
