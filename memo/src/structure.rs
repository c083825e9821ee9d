//! Memo format tags
//!
//! Standardized memos carry their envelope in the format field:
//! `v{version}.{enc}.{comp}.c{index}/{total}` with `enc` one of `-`/`e` and
//! `comp` one of `-`/`b`. Anything else is either a legacy memo (markers in
//! the data) or an unstructured one (plain username in the format).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::legacy;

static STANDARD_FORMAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^v(?P<version>\d+(?:\.\d+)*)\.(?P<enc>[-e])\.(?P<comp>[-b])\.(?:c(?P<index>\d+)/(?P<total>\d+)|-)$",
    )
    .expect("static regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EncryptionKind {
    None,
    /// Channel ECDH secret
    Ecdh,
}

impl EncryptionKind {
    pub fn tag(&self) -> char {
        match self {
            EncryptionKind::None => '-',
            EncryptionKind::Ecdh => 'e',
        }
    }

    pub fn from_flag(encrypt: bool) -> Self {
        if encrypt {
            EncryptionKind::Ecdh
        } else {
            EncryptionKind::None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CompressionKind {
    None,
    /// Base64-wrapped compressed bytes
    Compressed,
}

impl CompressionKind {
    pub fn tag(&self) -> char {
        match self {
            CompressionKind::None => '-',
            CompressionKind::Compressed => 'b',
        }
    }

    pub fn from_flag(compress: bool) -> Self {
        if compress {
            CompressionKind::Compressed
        } else {
            CompressionKind::None
        }
    }
}

/// Parsed envelope of one memo
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum MemoStructure {
    Standardized {
        version: String,
        encryption: EncryptionKind,
        compression: CompressionKind,
        /// `(index, total)`, absent for a `-` chunk slot
        chunk: Option<(u32, u32)>,
    },
    Legacy {
        chunk_index: Option<u32>,
    },
    Unstructured,
}

impl MemoStructure {
    /// Classify a memo from its format and data. Never fails.
    pub fn parse(format: &str, data: &str) -> Self {
        if let Some(caps) = STANDARD_FORMAT_RE.captures(format) {
            let encryption = if &caps["enc"] == "e" {
                EncryptionKind::Ecdh
            } else {
                EncryptionKind::None
            };
            let compression = if &caps["comp"] == "b" {
                CompressionKind::Compressed
            } else {
                CompressionKind::None
            };

            let chunk = match (caps.name("index"), caps.name("total")) {
                (Some(index), Some(total)) => {
                    match (index.as_str().parse::<u32>(), total.as_str().parse::<u32>()) {
                        (Ok(index), Ok(total)) if index >= 1 && index <= total => {
                            Some((index, total))
                        }
                        _ => return Self::parse_legacy(data),
                    }
                }
                _ => None,
            };

            return MemoStructure::Standardized {
                version: caps["version"].to_string(),
                encryption,
                compression,
                chunk,
            };
        }

        Self::parse_legacy(data)
    }

    fn parse_legacy(data: &str) -> Self {
        let chunk_index = legacy::chunk_label(data).map(|(index, _)| index);
        if chunk_index.is_some() || legacy::has_marker(data) {
            MemoStructure::Legacy { chunk_index }
        } else {
            MemoStructure::Unstructured
        }
    }

    /// Whether this memo uses the standardized envelope.
    pub fn is_valid_format(&self) -> bool {
        matches!(self, MemoStructure::Standardized { .. })
    }

    pub fn is_chunked(&self) -> bool {
        match self {
            MemoStructure::Standardized { chunk, .. } => chunk.is_some(),
            MemoStructure::Legacy { chunk_index } => chunk_index.is_some(),
            MemoStructure::Unstructured => false,
        }
    }

    pub fn chunk_index(&self) -> Option<u32> {
        match self {
            MemoStructure::Standardized { chunk, .. } => chunk.map(|(index, _)| index),
            MemoStructure::Legacy { chunk_index } => *chunk_index,
            MemoStructure::Unstructured => None,
        }
    }

    /// Declared chunk count. Legacy memos do not carry one.
    pub fn total_chunks(&self) -> Option<u32> {
        match self {
            MemoStructure::Standardized { chunk, .. } => chunk.map(|(_, total)| total),
            _ => None,
        }
    }

    pub fn encryption_kind(&self) -> EncryptionKind {
        match self {
            MemoStructure::Standardized { encryption, .. } => *encryption,
            _ => EncryptionKind::None,
        }
    }

    pub fn compression_kind(&self) -> CompressionKind {
        match self {
            MemoStructure::Standardized { compression, .. } => *compression,
            _ => CompressionKind::None,
        }
    }

    pub fn version(&self) -> Option<&str> {
        match self {
            MemoStructure::Standardized { version, .. } => Some(version),
            _ => None,
        }
    }
}

/// Format prefix without the chunk slot, e.g. `v1.e.b`.
pub fn format_prefix(
    version: &str,
    encryption: EncryptionKind,
    compression: CompressionKind,
) -> String {
    format!("v{}.{}.{}", version, encryption.tag(), compression.tag())
}

/// Full format tag for chunk `index` of `total`.
pub fn chunk_format(prefix: &str, index: u32, total: u32) -> String {
    format!("{}.c{}/{}", prefix, index, total)
}

#[cfg(test)]
mod structure_tests {
    use super::*;

    #[test]
    fn test_parse_standardized() {
        let s = MemoStructure::parse("v1.e.b.c2/5", "payload");
        assert!(s.is_valid_format());
        assert!(s.is_chunked());
        assert_eq!(s.chunk_index(), Some(2));
        assert_eq!(s.total_chunks(), Some(5));
        assert_eq!(s.encryption_kind(), EncryptionKind::Ecdh);
        assert_eq!(s.compression_kind(), CompressionKind::Compressed);
        assert_eq!(s.version(), Some("1"));
    }

    #[test]
    fn test_parse_dotted_version_and_plain_flags() {
        let s = MemoStructure::parse("v1.2.3.-.-.c1/1", "x");
        assert_eq!(s.version(), Some("1.2.3"));
        assert_eq!(s.encryption_kind(), EncryptionKind::None);
        assert_eq!(s.compression_kind(), CompressionKind::None);
    }

    #[test]
    fn test_parse_unchunked_slot() {
        let s = MemoStructure::parse("v1.-.b.-", "x");
        assert!(s.is_valid_format());
        assert!(!s.is_chunked());
        assert_eq!(s.total_chunks(), None);
    }

    #[test]
    fn test_out_of_range_index_not_standard() {
        assert!(!MemoStructure::parse("v1.-.-.c0/3", "x").is_valid_format());
        assert!(!MemoStructure::parse("v1.-.-.c4/3", "x").is_valid_format());
        assert!(!MemoStructure::parse("v1.x.-.c1/1", "x").is_valid_format());
        assert!(!MemoStructure::parse("v1.-.-.c1/1 ", "x").is_valid_format());
    }

    #[test]
    fn test_legacy_and_unstructured() {
        assert_eq!(
            MemoStructure::parse("alice", "chunk_3__abc"),
            MemoStructure::Legacy { chunk_index: Some(3) }
        );
        assert_eq!(
            MemoStructure::parse("alice", "WHISPER__abc"),
            MemoStructure::Legacy { chunk_index: None }
        );
        let plain = MemoStructure::parse("alice", "hello");
        assert_eq!(plain, MemoStructure::Unstructured);
        assert!(!plain.is_valid_format());
        assert!(!plain.is_chunked());
    }

    #[test]
    fn test_format_builders() {
        let prefix = format_prefix("1", EncryptionKind::Ecdh, CompressionKind::None);
        assert_eq!(prefix, "v1.e.-");
        let tag = chunk_format(&prefix, 1, 1);
        assert_eq!(tag, "v1.e.-.c1/1");
        assert_eq!(MemoStructure::parse(&tag, "").chunk_index(), Some(1));
    }
}
