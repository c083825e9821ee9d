//! Message chunking and reassembly
//!
//! Outbound payloads are split into near-equal ranges that each fit the
//! transport limit once hex-encoded. Inbound fragments are reassembled in
//! a deterministic order no matter how they were fetched.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::config::ProtocolConfig;
use crate::error::{MemoError, Result};
use crate::record::Memo;
use crate::size::calculate_memo_size;
use crate::structure::chunk_format;

/// Smallest data budget that still fits any UTF-8 scalar.
const MIN_CHUNK_DATA_BYTES: usize = 4;

// ============================================================================
// Splitting
// ============================================================================

/// Payload bytes available per chunk for this format prefix and memo type.
///
/// Computed against the widest chunk label the configuration allows, so
/// every chunk fits regardless of its actual position.
pub fn max_chunk_data_bytes(
    format_prefix: &str,
    memo_type: &str,
    config: &ProtocolConfig,
) -> Result<usize> {
    let worst_format = format!("{}{}", format_prefix, config.worst_chunk_label());
    let overhead =
        calculate_memo_size(&worst_format, memo_type, "", config.structural_overhead).total_size;

    let available = config.transport_limit.saturating_sub(overhead) / 2;
    if available < MIN_CHUNK_DATA_BYTES {
        return Err(MemoError::BudgetExceeded {
            limit: config.transport_limit,
            overhead,
        });
    }
    Ok(available)
}

/// Split `payload` into at most `max_chunks` pieces of at most `max_bytes`
/// bytes each, never cutting through a UTF-8 character.
pub fn split_payload(payload: &str, max_bytes: usize, max_chunks: u32) -> Result<Vec<&str>> {
    if payload.is_empty() {
        return Ok(vec![payload]);
    }
    let max_bytes = max_bytes.max(MIN_CHUNK_DATA_BYTES);
    let max_chunks = max_chunks as usize;

    let mut count = ((payload.len() + max_bytes - 1) / max_bytes).max(1);
    loop {
        if count > max_chunks {
            return Err(MemoError::TooManyChunks {
                required: count,
                max: max_chunks,
            });
        }
        if let Some(parts) = balanced_split(payload, count, max_bytes) {
            return Ok(parts);
        }
        count += 1;
    }
}

/// Greedy split aiming for `count` equal pieces. `None` if boundary
/// snapping leaves payload over after `count` pieces.
fn balanced_split(payload: &str, count: usize, max_bytes: usize) -> Option<Vec<&str>> {
    let mut parts = Vec::with_capacity(count);
    let mut start = 0;

    while start < payload.len() {
        let chunks_left = count.checked_sub(parts.len()).filter(|left| *left > 0)?;
        let remaining = payload.len() - start;
        let want = ((remaining + chunks_left - 1) / chunks_left).min(max_bytes);

        let mut end = start + want;
        while end > start && !payload.is_char_boundary(end) {
            end -= 1;
        }
        if end == start {
            end = start + payload[start..].chars().next()?.len_utf8();
        }

        parts.push(&payload[start..end]);
        start = end;
    }
    Some(parts)
}

/// Split a prepared payload into labeled memos `.c1/n` .. `.cn/n`.
///
/// Always produces at least one memo.
pub fn chunk_payload(
    payload: &str,
    format_prefix: &str,
    memo_type: &str,
    config: &ProtocolConfig,
) -> Result<Vec<Memo>> {
    let max_bytes = max_chunk_data_bytes(format_prefix, memo_type, config)?;
    let parts = split_payload(payload, max_bytes, config.max_chunks)?;
    let total = parts.len() as u32;

    debug!(
        payload_bytes = payload.len(),
        max_bytes,
        chunks = total,
        "Chunked payload"
    );

    Ok(parts
        .into_iter()
        .enumerate()
        .map(|(i, part)| Memo::new(chunk_format(format_prefix, i as u32 + 1, total), memo_type, part))
        .collect())
}

// ============================================================================
// Reassembly
// ============================================================================

/// One received piece of a chunked message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment<'a> {
    /// 1-based chunk position
    pub index: u32,
    pub data: &'a str,
    pub ledger_sequence: u64,
    pub hash: &'a str,
}

fn is_complete(sequence: &BTreeMap<u32, &str>, declared_total: Option<u32>) -> bool {
    let highest = match sequence.keys().next_back() {
        Some(highest) => *highest as usize,
        None => return false,
    };
    match declared_total {
        Some(total) => highest == total as usize && sequence.len() == highest,
        None => sequence.len() == highest,
    }
}

/// Reassemble a chunked message.
///
/// Fragments are ordered by (ledger sequence, index, hash) and placed by
/// their explicit position, so a send whose chunks landed out of order
/// still reassembles. A second fragment at position 1 starts a new send
/// attempt: if the sequence collected so far is complete, later fragments
/// are ignored, otherwise it is discarded. `declared_total` is the
/// `.c{i}/{total}` count, uniform within a valid group; legacy chunks pass
/// `None` and must cover `1..=highest`.
pub fn unchunk(
    group_id: &str,
    mut fragments: Vec<Fragment<'_>>,
    declared_total: Option<u32>,
) -> Result<String> {
    fragments.sort_by(|a, b| {
        (a.ledger_sequence, a.index, a.hash).cmp(&(b.ledger_sequence, b.index, b.hash))
    });
    fragments.dedup_by(|a, b| a.hash == b.hash && a.index == b.index);

    let mut sequence: BTreeMap<u32, &str> = BTreeMap::new();
    for fragment in &fragments {
        if fragment.index == 0 {
            warn!(group_id, hash = fragment.hash, "Ignoring chunk with position 0");
            continue;
        }

        if fragment.index == 1 && sequence.contains_key(&1) {
            if is_complete(&sequence, declared_total) {
                debug!(group_id, "Found complete sequence, ignoring later chunks");
                break;
            }
            warn!(
                group_id,
                dropped = sequence.len(),
                "Previous sequence incomplete, starting new sequence"
            );
            sequence.clear();
        }

        match sequence.get(&fragment.index) {
            Some(existing) if *existing == fragment.data => {}
            Some(_) => {
                return Err(MemoError::ConflictingChunk {
                    group_id: group_id.to_string(),
                    index: fragment.index,
                })
            }
            None => {
                sequence.insert(fragment.index, fragment.data);
            }
        }
    }

    if !is_complete(&sequence, declared_total) {
        let expected = declared_total
            .map(|total| total as usize)
            .or_else(|| sequence.keys().next_back().map(|k| *k as usize))
            .unwrap_or(0);
        return Err(MemoError::IncompleteGroup {
            group_id: group_id.to_string(),
            received: sequence.len(),
            expected,
        });
    }

    Ok(sequence.into_values().collect())
}
