//! Transaction history exports

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use pf_memo::TransactionRecord;
use tracing::debug;

/// Load a JSON array of raw transaction records
pub fn load_history(path: &Path) -> Result<Vec<TransactionRecord>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read history file {}", path.display()))?;
    let records: Vec<TransactionRecord> = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse history file {}", path.display()))?;

    debug!(path = %path.display(), records = records.len(), "Loaded history");
    Ok(records)
}
