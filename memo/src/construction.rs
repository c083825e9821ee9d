//! Outbound memo construction
//!
//! The transform order is fixed: encrypt, then compress, then chunk. Every
//! message is chunked, so even a short one carries `.c1/1`.

use serde::Serialize;
use tracing::{debug, info};

use crate::chunking::{chunk_payload, max_chunk_data_bytes, split_payload};
use crate::compression::compress;
use crate::config::ProtocolConfig;
use crate::crypto::{encrypt, encrypt_with_throwaway_key, CredentialProvider};
use crate::error::{MemoError, Result};
use crate::handshake::HandshakeRegistry;
use crate::ledger::PaymentRequest;
use crate::record::{generate_message_id, EncodedMemo, Memo};
use crate::structure::{format_prefix, CompressionKind, EncryptionKind};

/// What to send and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoConstructionParams {
    pub text: String,
    pub source: String,
    pub destination: String,
    /// Message id; generated when absent
    pub memo_type: Option<String>,
    pub encrypt: bool,
    pub compress: bool,
}

impl MemoConstructionParams {
    pub fn new(
        text: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            destination: destination.into(),
            memo_type: None,
            encrypt: false,
            compress: false,
        }
    }

    pub fn with_memo_type(mut self, memo_type: impl Into<String>) -> Self {
        self.memo_type = Some(memo_type.into());
        self
    }

    pub fn encrypted(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }

    pub fn compressed(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }
}

/// Memos of one outbound message, in chunk order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundGroup {
    pub group_id: String,
    pub source: String,
    pub destination: String,
    pub memos: Vec<Memo>,
}

impl OutboundGroup {
    pub fn len(&self) -> usize {
        self.memos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memos.is_empty()
    }

    /// Hex-encoded memos ready for the ledger.
    pub fn encoded(&self) -> Vec<EncodedMemo> {
        self.memos.iter().map(Memo::encode).collect()
    }

    /// One payment per chunk, each carrying `token_amount`.
    pub fn payment_requests(&self, token_amount: f64) -> Vec<PaymentRequest> {
        self.memos
            .iter()
            .map(|memo| PaymentRequest {
                source: self.source.clone(),
                destination: self.destination.clone(),
                memo: memo.encode(),
                token_amount,
            })
            .collect()
    }
}

/// Build the memos for one message.
///
/// Encryption needs a completed handshake between source and destination;
/// otherwise `HandshakeRequired` is returned and nothing is built.
pub fn construct_group(
    params: &MemoConstructionParams,
    registry: &HandshakeRegistry,
    credentials: &dyn CredentialProvider,
    config: &ProtocolConfig,
) -> Result<OutboundGroup> {
    let memo_type = params
        .memo_type
        .clone()
        .unwrap_or_else(generate_message_id);
    if memo_type.trim().is_empty() {
        return Err(MemoError::InvalidFormat("memo type must not be empty".into()));
    }

    let mut payload = params.text.clone();

    if params.encrypt {
        let status = registry.get_handshake(&params.source, &params.destination);
        let their_key = match status.received_key {
            Some(key) if status.sent => key,
            _ => {
                return Err(MemoError::HandshakeRequired {
                    source_address: params.source.clone(),
                    destination: params.destination.clone(),
                })
            }
        };
        let secret = credentials.shared_secret(&their_key)?;
        payload = encrypt(&payload, secret.as_bytes())?;
        debug!(memo_type = %memo_type, "Encrypted payload");
    }

    if params.compress {
        payload = compress(&payload, config.compression_level)?;
    }

    let prefix = format_prefix(
        &config.protocol_version,
        EncryptionKind::from_flag(params.encrypt),
        CompressionKind::from_flag(params.compress),
    );
    let memos = chunk_payload(&payload, &prefix, &memo_type, config)?;

    info!(
        memo_type = %memo_type,
        destination = %params.destination,
        chunks = memos.len(),
        "Constructed memo group"
    );

    Ok(OutboundGroup {
        group_id: memo_type,
        source: params.source.clone(),
        destination: params.destination.clone(),
        memos,
    })
}

/// Predict the chunk count [`construct_group`] would produce.
///
/// Encryption uses a throwaway key so no handshake is needed. Compression
/// is best effort: on failure the uncompressed size is used.
pub fn estimate_chunks(
    text: &str,
    encrypt: bool,
    compress_payload: bool,
    memo_type: Option<&str>,
    config: &ProtocolConfig,
) -> Result<usize> {
    let memo_type = memo_type
        .map(str::to_string)
        .unwrap_or_else(generate_message_id);

    let mut payload = text.to_string();
    if encrypt {
        payload = encrypt_with_throwaway_key(&payload)?;
    }
    if compress_payload {
        match compress(&payload, config.compression_level) {
            Ok(compressed) => payload = compressed,
            Err(e) => debug!(error = %e, "Compression failed during estimate, using raw size"),
        }
    }

    let prefix = format_prefix(
        &config.protocol_version,
        EncryptionKind::from_flag(encrypt),
        CompressionKind::from_flag(compress_payload),
    );
    let max_bytes = max_chunk_data_bytes(&prefix, &memo_type, config)?;
    Ok(split_payload(&payload, max_bytes, config.max_chunks)?.len())
}
