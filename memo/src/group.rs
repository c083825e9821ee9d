//! Memo group processing
//!
//! All memos sharing one type field form a logical message. A group is
//! validated, reassembled, decompressed and (when possible) decrypted here.
//! Decryption problems degrade to a visible placeholder instead of failing
//! the caller.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, warn};

use crate::chunking::{unchunk, Fragment};
use crate::compression::decompress;
use crate::config::ProtocolConfig;
use crate::crypto::{decrypt, CredentialProvider};
use crate::error::{MemoError, Result};
use crate::handshake::HandshakeRegistry;
use crate::legacy;
use crate::record::MemoTransaction;
use crate::structure::{CompressionKind, EncryptionKind, MemoStructure};

/// Marker shown in front of ciphertext that could not be decrypted.
pub const DECRYPTION_FAILED_MARKER: &str = "[Decryption Failed] ";

/// Everything needed to decrypt messages addressed to or from one wallet
pub struct DecryptionContext<'a> {
    pub wallet_address: &'a str,
    pub registry: &'a HandshakeRegistry,
    pub credentials: &'a dyn CredentialProvider,
}

/// Decoded message body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum MemoContent {
    /// Never encrypted
    Plain(String),
    Decrypted(String),
    /// Ciphertext left as is: no decryption requested or no channel yet
    Encrypted(String),
    /// Ciphertext that failed authentication or key derivation
    DecryptionFailed(String),
}

impl MemoContent {
    /// Raw text without any marker.
    pub fn text(&self) -> &str {
        match self {
            MemoContent::Plain(text)
            | MemoContent::Decrypted(text)
            | MemoContent::Encrypted(text)
            | MemoContent::DecryptionFailed(text) => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            MemoContent::Plain(text)
            | MemoContent::Decrypted(text)
            | MemoContent::Encrypted(text)
            | MemoContent::DecryptionFailed(text) => text,
        }
    }

    /// Text is readable plaintext.
    pub fn is_readable(&self) -> bool {
        matches!(self, MemoContent::Plain(_) | MemoContent::Decrypted(_))
    }
}

impl fmt::Display for MemoContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoContent::DecryptionFailed(data) => write!(f, "{}{}", DECRYPTION_FAILED_MARKER, data),
            other => f.write_str(other.text()),
        }
    }
}

// ============================================================================
// Memo Group
// ============================================================================

/// Memos sharing one type field
#[derive(Debug, Clone)]
pub struct MemoGroup {
    group_id: String,
    transactions: Vec<MemoTransaction>,
    structures: Vec<MemoStructure>,
}

impl MemoGroup {
    pub fn new(group_id: impl Into<String>, transactions: Vec<MemoTransaction>) -> Result<Self> {
        if transactions.is_empty() {
            return Err(MemoError::EmptyGroup);
        }
        let structures = transactions
            .iter()
            .map(|tx| MemoStructure::parse(&tx.memo.format, &tx.memo.data))
            .collect();
        Ok(Self {
            group_id: group_id.into(),
            transactions,
            structures,
        })
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn transactions(&self) -> &[MemoTransaction] {
        &self.transactions
    }

    fn first_index(&self) -> usize {
        (0..self.transactions.len())
            .min_by_key(|&i| {
                let tx = &self.transactions[i];
                (tx.ledger_sequence, tx.timestamp)
            })
            .unwrap_or(0)
    }

    /// Earliest record by ledger sequence.
    pub fn first(&self) -> &MemoTransaction {
        &self.transactions[self.first_index()]
    }

    /// Structure of the earliest record.
    pub fn structure(&self) -> &MemoStructure {
        &self.structures[self.first_index()]
    }

    pub fn is_standardized(&self) -> bool {
        self.structure().is_valid_format()
    }

    /// Chunk positions present, sorted, with duplicates.
    pub fn chunk_indices(&self) -> Vec<u32> {
        let mut indices: Vec<u32> = self.structures.iter().filter_map(|s| s.chunk_index()).collect();
        indices.sort_unstable();
        indices
    }

    pub fn latest_timestamp(&self) -> DateTime<Utc> {
        self.transactions
            .iter()
            .map(|tx| tx.timestamp)
            .max()
            .unwrap_or_else(|| self.first().timestamp)
    }

    /// Sum of tokens delivered across all records of the group.
    pub fn total_delivered_amount(&self) -> f64 {
        self.transactions.iter().map(|tx| tx.delivered_amount).sum()
    }

    fn latest(&self) -> &MemoTransaction {
        self.transactions
            .iter()
            .max_by_key(|tx| (tx.timestamp, tx.ledger_sequence))
            .unwrap_or(&self.transactions[0])
    }
}

/// True iff every record carries identical envelope metadata.
///
/// Standardized records must agree on encryption, compression and chunk
/// count; a group mixing standardized and other records is invalid.
pub fn validate_group(group: &MemoGroup) -> bool {
    let standardized = group.structures.iter().filter(|s| s.is_valid_format()).count();
    if standardized == 0 {
        return true;
    }
    if standardized != group.structures.len() {
        return false;
    }

    let first = &group.structures[0];
    group.structures.iter().all(|s| {
        s.encryption_kind() == first.encryption_kind()
            && s.compression_kind() == first.compression_kind()
            && s.total_chunks() == first.total_chunks()
    })
}

/// Decode a group into its message text.
///
/// Incomplete chunk sets and bad envelopes are errors. Compression errors
/// are hard failures. Decryption is best effort: without a context or a
/// complete handshake the ciphertext comes back as `Encrypted`, and a failed
/// decryption as `DecryptionFailed`.
pub fn parse_group(
    group: &MemoGroup,
    decrypt_requested: bool,
    ctx: Option<&DecryptionContext<'_>>,
    config: &ProtocolConfig,
) -> Result<MemoContent> {
    if !validate_group(group) {
        return Err(MemoError::InconsistentGroup {
            group_id: group.group_id.clone(),
        });
    }

    let structure = group.structure();
    let (payload, encrypted) = match structure {
        MemoStructure::Standardized { .. } => {
            let assembled = match structure.total_chunks() {
                Some(total) => {
                    let fragments = group
                        .transactions
                        .iter()
                        .zip(&group.structures)
                        .filter_map(|(tx, s)| {
                            s.chunk_index().map(|index| Fragment {
                                index,
                                data: &tx.memo.data,
                                ledger_sequence: tx.ledger_sequence,
                                hash: &tx.hash,
                            })
                        })
                        .collect();
                    unchunk(&group.group_id, fragments, Some(total))?
                }
                None => group.latest().memo.data.clone(),
            };

            let decompressed = match structure.compression_kind() {
                CompressionKind::Compressed => {
                    decompress(&assembled, config.max_decompressed_bytes)?
                }
                CompressionKind::None => assembled,
            };
            (
                decompressed,
                structure.encryption_kind() == EncryptionKind::Ecdh,
            )
        }
        MemoStructure::Legacy { .. } => {
            let refs: Vec<&MemoTransaction> = group.transactions.iter().collect();
            let assembled = legacy::reassemble(&group.group_id, &refs)?;
            let envelope = legacy::unwrap(&assembled, config.max_decompressed_bytes)?;
            (envelope.payload, envelope.encrypted)
        }
        MemoStructure::Unstructured => (group.latest().memo.data.clone(), false),
    };

    if !encrypted {
        return Ok(MemoContent::Plain(payload));
    }
    if !decrypt_requested {
        return Ok(MemoContent::Encrypted(payload));
    }
    Ok(decrypt_group_payload(group, payload, ctx))
}

fn decrypt_group_payload(
    group: &MemoGroup,
    ciphertext: String,
    ctx: Option<&DecryptionContext<'_>>,
) -> MemoContent {
    let ctx = match ctx {
        Some(ctx) => ctx,
        None => {
            warn!(group_id = %group.group_id, "Cannot decrypt message: no decryption context");
            return MemoContent::Encrypted(ciphertext);
        }
    };

    let first = group.first();
    let (channel, counterparty) = if first.destination == ctx.wallet_address {
        (first.destination.as_str(), first.account.as_str())
    } else if first.account == ctx.wallet_address {
        (first.account.as_str(), first.destination.as_str())
    } else {
        warn!(group_id = %group.group_id, "Cannot decrypt message: wallet is not a party");
        return MemoContent::Encrypted(ciphertext);
    };

    let status = ctx.registry.get_handshake(channel, counterparty);
    let their_key = match status.received_key {
        Some(key) if status.sent => key,
        _ => {
            warn!(
                group_id = %group.group_id,
                channel,
                counterparty,
                "Cannot decrypt message: no handshake found"
            );
            return MemoContent::Encrypted(ciphertext);
        }
    };

    let secret = match ctx.credentials.shared_secret(&their_key) {
        Ok(secret) => secret,
        Err(e) => {
            error!(group_id = %group.group_id, error = %e, "Shared secret derivation failed");
            return MemoContent::DecryptionFailed(ciphertext);
        }
    };

    match decrypt(&ciphertext, secret.as_bytes()) {
        Ok(text) => MemoContent::Decrypted(text),
        Err(e) => {
            error!(group_id = %group.group_id, error = %e, "Decryption failed");
            MemoContent::DecryptionFailed(ciphertext)
        }
    }
}

// ============================================================================
// Grouping
// ============================================================================

/// Group transactions by memo type, most recently active first.
///
/// With `standardized_only`, groups whose earliest record is not in the
/// standardized format are dropped.
pub fn groups_from_history(
    transactions: &[MemoTransaction],
    standardized_only: bool,
) -> Vec<MemoGroup> {
    let mut by_type: BTreeMap<&str, Vec<MemoTransaction>> = BTreeMap::new();
    for tx in transactions {
        by_type
            .entry(tx.memo.memo_type.as_str())
            .or_default()
            .push(tx.clone());
    }

    let mut groups: Vec<MemoGroup> = by_type
        .into_iter()
        .filter_map(|(memo_type, txs)| MemoGroup::new(memo_type, txs).ok())
        .filter(|group| !standardized_only || group.is_standardized())
        .collect();

    groups.sort_by(|a, b| {
        b.latest_timestamp()
            .cmp(&a.latest_timestamp())
            .then_with(|| a.group_id.cmp(&b.group_id))
    });
    groups
}

/// The `n` most recently active standardized groups.
pub fn latest_groups(transactions: &[MemoTransaction], n: usize) -> Vec<MemoGroup> {
    let mut groups = groups_from_history(transactions, true);
    groups.truncate(n);
    groups
}

#[cfg(test)]
mod group_tests {
    use super::*;
    use crate::record::Memo;
    use chrono::TimeZone;

    fn tx(hash: &str, format: &str, memo_type: &str, data: &str, seq: u64) -> MemoTransaction {
        MemoTransaction {
            hash: hash.into(),
            account: "rA".into(),
            destination: "rB".into(),
            memo: Memo::new(format, memo_type, data),
            ledger_sequence: seq,
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
                + chrono::Duration::seconds(seq as i64),
            delivered_amount: 1.0,
        }
    }

    #[test]
    fn test_validate_group() {
        let good = MemoGroup::new(
            "g",
            vec![tx("1", "v1.-.-.c1/2", "g", "a", 1), tx("2", "v1.-.-.c2/2", "g", "b", 2)],
        )
        .unwrap();
        assert!(validate_group(&good));

        let mismatched = MemoGroup::new(
            "g",
            vec![tx("1", "v1.e.-.c1/2", "g", "a", 1), tx("2", "v1.-.-.c2/2", "g", "b", 2)],
        )
        .unwrap();
        assert!(!validate_group(&mismatched));

        let mixed = MemoGroup::new(
            "g",
            vec![tx("1", "v1.-.-.c1/2", "g", "a", 1), tx("2", "alice", "g", "b", 2)],
        )
        .unwrap();
        assert!(!validate_group(&mixed));
        assert!(matches!(
            parse_group(&mixed, false, None, &ProtocolConfig::default()),
            Err(MemoError::InconsistentGroup { .. })
        ));
    }

    #[test]
    fn test_empty_group_rejected() {
        assert!(matches!(MemoGroup::new("g", vec![]), Err(MemoError::EmptyGroup)));
    }

    #[test]
    fn test_parse_plain_chunked() {
        let group = MemoGroup::new(
            "g",
            vec![tx("2", "v1.-.-.c2/2", "g", "world", 2), tx("1", "v1.-.-.c1/2", "g", "hello ", 1)],
        )
        .unwrap();
        let content = parse_group(&group, true, None, &ProtocolConfig::default()).unwrap();
        assert_eq!(content, MemoContent::Plain("hello world".into()));
        assert_eq!(group.chunk_indices(), vec![1, 2]);
        assert_eq!(group.total_delivered_amount(), 2.0);
    }

    #[test]
    fn test_encrypted_without_context_left_encrypted() {
        let group = MemoGroup::new("g", vec![tx("1", "v1.e.-.c1/1", "g", "CIPHER", 1)]).unwrap();
        let config = ProtocolConfig::default();
        assert_eq!(
            parse_group(&group, true, None, &config).unwrap(),
            MemoContent::Encrypted("CIPHER".into())
        );
        assert_eq!(
            parse_group(&group, false, None, &config).unwrap(),
            MemoContent::Encrypted("CIPHER".into())
        );
    }

    #[test]
    fn test_bad_compression_is_hard_error() {
        let group = MemoGroup::new("g", vec![tx("1", "v1.-.b.c1/1", "g", "not*base64", 1)]).unwrap();
        assert!(matches!(
            parse_group(&group, true, None, &ProtocolConfig::default()),
            Err(MemoError::Compression(_))
        ));
    }

    #[test]
    fn test_unstructured_group_plain() {
        let group = MemoGroup::new("HANDSHAKE", vec![tx("1", "alice", "HANDSHAKE", "EDKEY", 1)]).unwrap();
        assert!(!group.is_standardized());
        assert_eq!(
            parse_group(&group, true, None, &ProtocolConfig::default()).unwrap(),
            MemoContent::Plain("EDKEY".into())
        );
    }

    #[test]
    fn test_failed_marker_rendering() {
        let failed = MemoContent::DecryptionFailed("abc".into());
        assert_eq!(failed.to_string(), "[Decryption Failed] abc");
        assert_eq!(failed.text(), "abc");
        assert!(!failed.is_readable());
    }

    #[test]
    fn test_groups_ordered_by_activity() {
        let history = vec![
            tx("1", "v1.-.-.c1/1", "old", "a", 1),
            tx("2", "v1.-.-.c1/1", "new", "b", 5),
            tx("3", "alice", "HANDSHAKE", "EDKEY", 9),
        ];
        let all = groups_from_history(&history, false);
        assert_eq!(all[0].group_id(), "HANDSHAKE");

        let standardized = groups_from_history(&history, true);
        let ids: Vec<&str> = standardized.iter().map(|g| g.group_id()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        let latest = latest_groups(&history, 1);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].group_id(), "new");
    }
}
