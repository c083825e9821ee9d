//! Protocol configuration
//!
//! Transport limits and format constants are configuration, not protocol:
//! one `ProtocolConfig` is built by the caller and handed to the engine.

use serde::{Deserialize, Serialize};

use crate::error::{MemoError, Result};

/// Ledger memo size limit in bytes (hex-encoded triplet).
pub const DEFAULT_TRANSPORT_LIMIT: usize = 1024;

/// Conservative limit historically used by wallets that over-counted overhead.
pub const CONSERVATIVE_TRANSPORT_LIMIT: usize = 760;

/// Bytes reserved for memo envelope serialization.
pub const DEFAULT_STRUCTURAL_OVERHEAD: usize = 100;

/// Largest chunk count expressible by the `.c{n}/{total}` label.
pub const DEFAULT_MAX_CHUNKS: u32 = 999;

/// Default brotli quality, the reference encoder's maximum.
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 11;

/// Upper bound on decompressed payloads.
pub const DEFAULT_MAX_DECOMPRESSED_BYTES: usize = 10 * 1024 * 1024;

/// Ledger result code of an applied transaction.
pub const SUCCESS_RESULT_CODE: &str = "tesSUCCESS";

fn default_transport_limit() -> usize {
    DEFAULT_TRANSPORT_LIMIT
}

fn default_structural_overhead() -> usize {
    DEFAULT_STRUCTURAL_OVERHEAD
}

fn default_protocol_version() -> String {
    "1".to_string()
}

fn default_max_chunks() -> u32 {
    DEFAULT_MAX_CHUNKS
}

fn default_compression_level() -> u32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_max_decompressed_bytes() -> usize {
    DEFAULT_MAX_DECOMPRESSED_BYTES
}

fn default_success_code() -> String {
    SUCCESS_RESULT_CODE.to_string()
}

/// Format constants and network addresses used by the memo engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Maximum hex-encoded memo size accepted by the ledger
    #[serde(default = "default_transport_limit")]
    pub transport_limit: usize,
    /// Bytes added to every size computation for envelope serialization
    #[serde(default = "default_structural_overhead")]
    pub structural_overhead: usize,
    /// Version written into standardized format tags
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default = "default_max_chunks")]
    pub max_chunks: u32,
    #[serde(default = "default_compression_level")]
    pub compression_level: u32,
    #[serde(default = "default_max_decompressed_bytes")]
    pub max_decompressed_bytes: usize,
    /// Result code that marks a transaction as applied
    #[serde(default = "default_success_code")]
    pub success_code: String,
    /// Task node address (requires a token per message)
    #[serde(default)]
    pub node_address: Option<String>,
    /// Remembrancer address (requires a token per message)
    #[serde(default)]
    pub remembrancer_address: Option<String>,
    /// Token issuer address
    #[serde(default)]
    pub issuer_address: Option<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            transport_limit: DEFAULT_TRANSPORT_LIMIT,
            structural_overhead: DEFAULT_STRUCTURAL_OVERHEAD,
            protocol_version: default_protocol_version(),
            max_chunks: DEFAULT_MAX_CHUNKS,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            max_decompressed_bytes: DEFAULT_MAX_DECOMPRESSED_BYTES,
            success_code: default_success_code(),
            node_address: None,
            remembrancer_address: None,
            issuer_address: None,
        }
    }
}

impl ProtocolConfig {
    /// Preset using the conservative 760 byte limit.
    pub fn conservative() -> Self {
        Self {
            transport_limit: CONSERVATIVE_TRANSPORT_LIMIT,
            ..Self::default()
        }
    }

    pub fn with_transport_limit(mut self, limit: usize) -> Self {
        self.transport_limit = limit;
        self
    }

    pub fn with_structural_overhead(mut self, overhead: usize) -> Self {
        self.structural_overhead = overhead;
        self
    }

    /// Check that the values describe a usable transport.
    pub fn validate(&self) -> Result<()> {
        if self.transport_limit == 0 {
            return Err(MemoError::InvalidConfig(
                "transport_limit must be greater than zero".into(),
            ));
        }
        if self.structural_overhead >= self.transport_limit {
            return Err(MemoError::InvalidConfig(format!(
                "structural_overhead {} leaves no room under transport_limit {}",
                self.structural_overhead, self.transport_limit
            )));
        }
        if self.max_chunks == 0 {
            return Err(MemoError::InvalidConfig("max_chunks must be at least 1".into()));
        }
        if self.protocol_version.is_empty()
            || !self
                .protocol_version
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(MemoError::InvalidConfig(format!(
                "protocol_version {:?} must be dotted digits",
                self.protocol_version
            )));
        }
        if self.compression_level > 11 {
            return Err(MemoError::InvalidConfig(format!(
                "compression_level {} outside 0..=11",
                self.compression_level
            )));
        }
        if self.success_code.is_empty() {
            return Err(MemoError::InvalidConfig("success_code must not be empty".into()));
        }
        Ok(())
    }

    /// Worst-case chunk label for this configuration, e.g. `.c999/999`.
    pub fn worst_chunk_label(&self) -> String {
        format!(".c{0}/{0}", self.max_chunks)
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProtocolConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.transport_limit, 1024);
        assert_eq!(config.structural_overhead, 100);
        assert_eq!(config.worst_chunk_label(), ".c999/999");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ProtocolConfig =
            serde_json::from_str(r#"{"transport_limit": 760}"#).unwrap();
        assert_eq!(config.transport_limit, 760);
        assert_eq!(config.max_chunks, DEFAULT_MAX_CHUNKS);
        assert_eq!(config.success_code, "tesSUCCESS");
    }

    #[test]
    fn test_overhead_larger_than_limit_rejected() {
        let config = ProtocolConfig::default()
            .with_transport_limit(50)
            .with_structural_overhead(100);
        assert!(matches!(config.validate(), Err(MemoError::InvalidConfig(_))));
    }

    #[test]
    fn test_compression_level_is_brotli_quality() {
        assert_eq!(ProtocolConfig::default().compression_level, 11);
        let config = ProtocolConfig {
            compression_level: 12,
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_version_rejected() {
        let config = ProtocolConfig {
            protocol_version: "1.x".into(),
            ..ProtocolConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
