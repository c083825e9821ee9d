//! Payload compression
//!
//! Brotli-compressed bytes carried as standard base64 text. Decoding tolerates
//! stripped padding, since some ledger tooling trims trailing `=`.

use std::io::{Read, Write};

use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::debug;

use crate::error::CompressionError;

/// Brotli window size, log2. Matches the reference encoder default.
const WINDOW_BITS: u32 = 22;

const BUFFER_SIZE: usize = 4096;

/// Compress `text` at brotli `quality` (0..=11) and return it base64-encoded.
pub fn compress(text: &str, quality: u32) -> Result<String, CompressionError> {
    let mut writer =
        brotli::CompressorWriter::new(Vec::new(), BUFFER_SIZE, quality, WINDOW_BITS);
    writer
        .write_all(text.as_bytes())
        .map_err(|e| CompressionError::Codec(e.to_string()))?;
    let compressed = writer.into_inner();
    debug!(
        input = text.len(),
        output = compressed.len(),
        "Compressed payload"
    );
    Ok(STANDARD.encode(compressed))
}

/// Reverse [`compress`], bounding the decompressed size by `max_size`.
pub fn decompress(encoded: &str, max_size: usize) -> Result<String, CompressionError> {
    if let Some((position, character)) = encoded
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '+' || *c == '/' || *c == '='))
    {
        return Err(CompressionError::InvalidCharacter { character, position });
    }

    let mut padded = encoded.to_string();
    let remainder = padded.len() % 4;
    if remainder != 0 {
        padded.extend(std::iter::repeat('=').take(4 - remainder));
    }

    let bytes = STANDARD
        .decode(padded.as_bytes())
        .map_err(|e| CompressionError::Base64(e.to_string()))?;

    let decoder = brotli::Decompressor::new(&bytes[..], BUFFER_SIZE);
    let mut output = Vec::new();
    decoder
        .take(max_size as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| CompressionError::Codec(e.to_string()))?;
    if output.len() > max_size {
        return Err(CompressionError::TooLarge {
            size: output.len(),
            max: max_size,
        });
    }

    String::from_utf8(output).map_err(|_| CompressionError::InvalidUtf8)
}

#[cfg(test)]
mod compression_tests {
    use super::*;

    const MAX: usize = 1 << 20;

    #[test]
    fn test_roundtrip_empty_and_unicode() {
        let long = "repeat ".repeat(200);
        for text in ["", "a", "héllo wörld ✓ 日本語", long.as_str()] {
            let packed = compress(text, 3).unwrap();
            assert_eq!(decompress(&packed, MAX).unwrap(), text);
        }
    }

    #[test]
    fn test_repetitive_text_shrinks() {
        let text = "please review my draft by Friday. ".repeat(50);
        let packed = compress(&text, 3).unwrap();
        assert!(packed.len() < text.len() / 4, "got {} bytes", packed.len());
    }

    #[test]
    fn test_stripped_padding_accepted() {
        let packed = compress("padding check", 3).unwrap();
        let stripped = packed.trim_end_matches('=');
        assert_eq!(decompress(stripped, MAX).unwrap(), "padding check");
    }

    #[test]
    fn test_invalid_character_rejected() {
        let err = decompress("abc$def", MAX).unwrap_err();
        assert_eq!(
            err,
            CompressionError::InvalidCharacter {
                character: '$',
                position: 3
            }
        );
    }

    #[test]
    fn test_stored_block_stream_decodes() {
        // Stream written by another encoder: one uncompressed meta-block
        // followed by an empty last block.
        let encoded = "8AEQcGxlYXNlIHJldmlldyBteSBkcmFmdCBieSBGcmlkYXkD";
        assert_eq!(
            decompress(encoded, MAX).unwrap(),
            "please review my draft by Friday"
        );
    }

    #[test]
    fn test_reserved_bit_rejected() {
        // metadata block header with the reserved bit set
        let err = decompress(&STANDARD.encode([0x1c, 0x00, 0x00]), MAX).unwrap_err();
        assert!(matches!(err, CompressionError::Codec(_)));
    }

    #[test]
    fn test_output_bound_enforced() {
        let packed = compress(&"x".repeat(5000), 3).unwrap();
        assert!(matches!(
            decompress(&packed, 100),
            Err(CompressionError::TooLarge { max: 100, .. })
        ));
    }
}
