//! Read-only decoder for pre-standard memos
//!
//! Older wallets embedded their envelope in the data field itself:
//! `chunk_{n}__` in front of every fragment, then `COMPRESSED__` in front of
//! the compressed payload and `WHISPER__` in front of ciphertext. This is
//! the only place those markers are recognized; nothing new is written in
//! this form.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::chunking::{unchunk, Fragment};
use crate::compression::decompress;
use crate::error::{MemoError, Result};
use crate::record::MemoTransaction;

const COMPRESSED_MARKER: &str = "COMPRESSED__";
const ENCRYPTED_MARKER: &str = "WHISPER__";

static CHUNK_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^chunk_(\d+)__").expect("static regex"));

/// Parse a leading `chunk_{n}__` label, returning the index and the rest.
pub fn chunk_label(data: &str) -> Option<(u32, &str)> {
    let caps = CHUNK_LABEL_RE.captures(data)?;
    let index = caps.get(1)?.as_str().parse().ok()?;
    let label_len = caps.get(0)?.end();
    Some((index, &data[label_len..]))
}

/// Whether the data (after any chunk label) begins with a legacy marker.
pub fn has_marker(data: &str) -> bool {
    let body = chunk_label(data).map(|(_, rest)| rest).unwrap_or(data);
    body.starts_with(COMPRESSED_MARKER) || body.starts_with(ENCRYPTED_MARKER)
}

/// Legacy payload with its markers removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyEnvelope {
    pub payload: String,
    /// Payload is ciphertext that still needs the channel secret
    pub encrypted: bool,
}

/// Reassemble the memos of one legacy message.
///
/// Labeled fragments go through the shared reassembler; a group without
/// labels yields the most recent record's data.
pub fn reassemble(group_id: &str, transactions: &[&MemoTransaction]) -> Result<String> {
    let fragments: Vec<Fragment<'_>> = transactions
        .iter()
        .filter_map(|tx| {
            chunk_label(&tx.memo.data).map(|(index, rest)| Fragment {
                index,
                data: rest,
                ledger_sequence: tx.ledger_sequence,
                hash: &tx.hash,
            })
        })
        .collect();

    if !fragments.is_empty() {
        return unchunk(group_id, fragments, None);
    }

    transactions
        .iter()
        .max_by_key(|tx| (tx.timestamp, tx.ledger_sequence))
        .map(|tx| tx.memo.data.clone())
        .ok_or(MemoError::EmptyGroup)
}

/// Strip the compression and encryption markers, decompressing as needed.
pub fn unwrap(payload: &str, max_decompressed: usize) -> Result<LegacyEnvelope> {
    let mut body = match payload.strip_prefix(COMPRESSED_MARKER) {
        Some(compressed) => decompress(compressed, max_decompressed)?,
        None => payload.to_string(),
    };

    let encrypted = match body.strip_prefix(ENCRYPTED_MARKER) {
        Some(ciphertext) => {
            body = ciphertext.to_string();
            true
        }
        None => false,
    };

    Ok(LegacyEnvelope {
        payload: body,
        encrypted,
    })
}
