//! Ledger transport records and message ids
//!
//! A memo travels as three hex-encoded strings (format, type, data). This
//! module holds the raw ledger shape, its decoded form and the plaintext
//! triplet used while building outbound messages.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{MemoError, Result};

/// Version prefix written in front of generated message ids
pub const MESSAGE_ID_VERSION: &str = "v1.0";

static MESSAGE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:v\d+\.\d+\.)?\d{4}-\d{2}-\d{2}_\d{2}:\d{2}(?:__[A-Z0-9]{4})?")
        .expect("static regex")
});

/// Raw transaction as returned by the history collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub hash: String,
    pub account: String,
    pub destination: String,
    #[serde(default)]
    pub memo_format_hex: String,
    #[serde(default)]
    pub memo_type_hex: String,
    #[serde(default)]
    pub memo_data_hex: String,
    pub ledger_sequence: u64,
    pub timestamp: DateTime<Utc>,
    pub result_code: String,
    /// Delivered token amount as a decimal string
    #[serde(default)]
    pub delivered_amount: Option<String>,
}

impl TransactionRecord {
    /// Decode the three memo fields into text.
    pub fn decode(&self) -> Result<MemoTransaction> {
        Ok(MemoTransaction {
            hash: self.hash.clone(),
            account: self.account.clone(),
            destination: self.destination.clone(),
            memo: Memo {
                format: decode_field("format", &self.memo_format_hex)?,
                memo_type: decode_field("type", &self.memo_type_hex)?,
                data: decode_field("data", &self.memo_data_hex)?,
            },
            ledger_sequence: self.ledger_sequence,
            timestamp: self.timestamp,
            delivered_amount: self
                .delivered_amount
                .as_deref()
                .and_then(|amount| amount.trim().parse::<f64>().ok())
                .unwrap_or(0.0),
        })
    }

    /// Build a record carrying an encoded memo. Used by in-memory stores and tests.
    pub fn from_encoded(
        hash: impl Into<String>,
        account: impl Into<String>,
        destination: impl Into<String>,
        memo: &EncodedMemo,
        ledger_sequence: u64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            hash: hash.into(),
            account: account.into(),
            destination: destination.into(),
            memo_format_hex: memo.format_hex.clone(),
            memo_type_hex: memo.type_hex.clone(),
            memo_data_hex: memo.data_hex.clone(),
            ledger_sequence,
            timestamp,
            result_code: crate::config::SUCCESS_RESULT_CODE.to_string(),
            delivered_amount: None,
        }
    }
}

fn decode_field(field: &'static str, hex_str: &str) -> Result<String> {
    let bytes = hex::decode(hex_str.trim()).map_err(|e| MemoError::InvalidHex {
        field,
        reason: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| MemoError::InvalidHex {
        field,
        reason: e.to_string(),
    })
}

/// Decode the successful records of a history slice.
///
/// Records with a failing result code are dropped; records whose memo fields
/// are not valid hex are skipped with a warning.
pub fn decode_records(records: &[TransactionRecord], success_code: &str) -> Vec<MemoTransaction> {
    records
        .iter()
        .filter(|record| record.result_code == success_code)
        .filter_map(|record| match record.decode() {
            Ok(tx) => Some(tx),
            Err(e) => {
                warn!(hash = %record.hash, error = %e, "Skipping undecodable memo");
                None
            }
        })
        .collect()
}

/// Memo triplet in plain text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub format: String,
    pub memo_type: String,
    pub data: String,
}

impl Memo {
    pub fn new(
        format: impl Into<String>,
        memo_type: impl Into<String>,
        data: impl Into<String>,
    ) -> Self {
        Self {
            format: format.into(),
            memo_type: memo_type.into(),
            data: data.into(),
        }
    }

    /// Uppercase hex encoding for the ledger.
    pub fn encode(&self) -> EncodedMemo {
        EncodedMemo {
            format_hex: hex::encode_upper(self.format.as_bytes()),
            type_hex: hex::encode_upper(self.memo_type.as_bytes()),
            data_hex: hex::encode_upper(self.data.as_bytes()),
        }
    }
}

/// Memo triplet as written to the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedMemo {
    pub format_hex: String,
    pub type_hex: String,
    pub data_hex: String,
}

impl EncodedMemo {
    /// Total hex length of the three fields.
    pub fn hex_len(&self) -> usize {
        self.format_hex.len() + self.type_hex.len() + self.data_hex.len()
    }
}

/// A successful ledger transaction with its memo decoded
#[derive(Debug, Clone, PartialEq)]
pub struct MemoTransaction {
    pub hash: String,
    pub account: String,
    pub destination: String,
    pub memo: Memo,
    pub ledger_sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Delivered token amount, zero when absent or unparsable
    pub delivered_amount: f64,
}

impl MemoTransaction {
    /// Whether this transaction was sent by `address`.
    pub fn is_outgoing_from(&self, address: &str) -> bool {
        self.account == address
    }
}

/// Generate a message id `v1.0.YYYY-MM-DD_HH:MM__LLNN` for `now`.
pub fn generate_message_id_at(now: DateTime<Utc>) -> String {
    let mut rng = rand::thread_rng();
    let letters: String = (0..2)
        .map(|_| char::from(b'A' + rng.gen_range(0..26u8)))
        .collect();
    let digits: String = (0..2)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect();
    format!(
        "{}.{}__{}{}",
        MESSAGE_ID_VERSION,
        now.format("%Y-%m-%d_%H:%M"),
        letters,
        digits
    )
}

pub fn generate_message_id() -> String {
    generate_message_id_at(Utc::now())
}

/// Whether `id` looks like a generated message id (versioned or bare).
pub fn is_message_id(id: &str) -> bool {
    MESSAGE_ID_RE.is_match(id)
}

#[cfg(test)]
mod record_tests {
    use super::*;
    use chrono::TimeZone;

    fn record(format: &str, memo_type: &str, data: &str, code: &str) -> TransactionRecord {
        TransactionRecord {
            hash: "H1".into(),
            account: "rAlice".into(),
            destination: "rBob".into(),
            memo_format_hex: hex::encode(format),
            memo_type_hex: hex::encode(memo_type),
            memo_data_hex: hex::encode(data),
            ledger_sequence: 10,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            result_code: code.into(),
            delivered_amount: Some("1.5".into()),
        }
    }

    #[test]
    fn test_decode_record() {
        let tx = record("v1.-.-.c1/1", "v1.0.2024-03-01_12:00__AB12", "héllo", "tesSUCCESS")
            .decode()
            .unwrap();
        assert_eq!(tx.memo.data, "héllo");
        assert_eq!(tx.delivered_amount, 1.5);
        assert!(tx.is_outgoing_from("rAlice"));
    }

    #[test]
    fn test_decode_records_filters_and_skips() {
        let mut bad_hex = record("f", "t", "d", "tesSUCCESS");
        bad_hex.memo_data_hex = "ZZ".into();
        let records = vec![
            record("f", "t", "ok", "tesSUCCESS"),
            record("f", "t", "failed", "tecPATH_DRY"),
            bad_hex,
        ];
        let decoded = decode_records(&records, "tesSUCCESS");
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].memo.data, "ok");
    }

    #[test]
    fn test_invalid_hex_names_field() {
        let mut rec = record("f", "t", "d", "tesSUCCESS");
        rec.memo_type_hex = "0".into();
        match rec.decode() {
            Err(MemoError::InvalidHex { field, .. }) => assert_eq!(field, "type"),
            other => panic!("expected InvalidHex, got {:?}", other),
        }
    }

    #[test]
    fn test_generated_id_shape() {
        let now = Utc.with_ymd_and_hms(2024, 11, 5, 9, 7, 0).unwrap();
        let id = generate_message_id_at(now);
        assert!(id.starts_with("v1.0.2024-11-05_09:07__"), "got {}", id);
        assert_eq!(id.len(), "v1.0.2024-11-05_09:07__AB12".len());
        assert!(is_message_id(&id));
        assert!(is_message_id("2024-11-05_09:07__XY99"));
        assert!(!is_message_id("HANDSHAKE"));
    }

    #[test]
    fn test_encode_uppercase_hex() {
        let encoded = Memo::new("ab", "HANDSHAKE", "z").encode();
        assert_eq!(encoded.format_hex, "6162");
        assert_eq!(encoded.data_hex, "7A");
        assert_eq!(encoded.hex_len(), 4 + 18 + 2);
    }
}
