//! Memo size accounting
//!
//! Sizes are measured in hex characters, which is what the ledger counts:
//! every UTF-8 byte costs two. Construction and estimation share these
//! functions so both arrive at the same chunk counts.

use serde::Serialize;

/// Hex-encoded size of a string.
pub fn hex_size(text: &str) -> usize {
    text.len() * 2
}

/// Size breakdown of one memo triplet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoSize {
    pub format_size: usize,
    pub type_size: usize,
    pub data_size: usize,
    pub structural_overhead: usize,
    pub total_size: usize,
}

impl MemoSize {
    /// True if the memo fits under `limit`.
    pub fn fits(&self, limit: usize) -> bool {
        self.total_size <= limit
    }
}

/// Compute the hex-encoded size of a memo triplet plus envelope overhead.
pub fn calculate_memo_size(
    format: &str,
    memo_type: &str,
    data: &str,
    structural_overhead: usize,
) -> MemoSize {
    let format_size = hex_size(format);
    let type_size = hex_size(memo_type);
    let data_size = hex_size(data);
    MemoSize {
        format_size,
        type_size,
        data_size,
        structural_overhead,
        total_size: format_size + type_size + data_size + structural_overhead,
    }
}
