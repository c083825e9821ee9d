//! Error types for memo protocol operations.

use thiserror::Error;

use crate::wallet_state::WalletState;

/// Errors raised by the compression codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompressionError {
    /// Input contains characters outside the base64 alphabet.
    #[error("Invalid character {character:?} at position {position} in compressed data")]
    InvalidCharacter {
        /// The offending character.
        character: char,
        /// Byte offset of the character.
        position: usize,
    },

    /// Base64 decoding failed after padding.
    #[error("Base64 decode error: {0}")]
    Base64(String),

    /// The brotli codec rejected the data.
    #[error("Codec error: {0}")]
    Codec(String),

    /// Decompressed output exceeds the configured bound.
    #[error("Decompressed data too large: {size} bytes (max {max})")]
    TooLarge {
        /// Decompressed size.
        size: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// Decompressed bytes are not UTF-8.
    #[error("Decompressed data is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors raised by key derivation and symmetric encryption.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Ciphertext failed authentication or could not be parsed.
    #[error("Invalid token")]
    InvalidToken,

    /// Decrypted bytes are not UTF-8.
    #[error("Decrypted message is not valid UTF-8")]
    InvalidPlaintext,

    /// Public key is malformed or not a valid curve point.
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Wallet seed is malformed.
    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    /// Cipher construction or encryption failed.
    #[error("Encryption failed: {0}")]
    Encryption(String),
}

/// An operation was attempted before the wallet reached the required state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Wallet is {actual}, but {required} is required to {operation}")]
pub struct NotReadyError {
    /// Operation that was refused.
    pub operation: String,
    /// Minimum state the operation needs.
    pub required: WalletState,
    /// State the wallet is actually in.
    pub actual: WalletState,
}

/// Errors that can occur during memo protocol operations.
#[derive(Error, Debug)]
pub enum MemoError {
    /// Memo format tag is malformed.
    #[error("Invalid memo format: {0}")]
    InvalidFormat(String),

    /// A memo field is not valid hex or not UTF-8 once decoded.
    #[error("Invalid hex in memo field {field}: {reason}")]
    InvalidHex {
        /// Field name (format, type or data).
        field: &'static str,
        /// Decoder message.
        reason: String,
    },

    /// Group contains no records.
    #[error("Memo group is empty")]
    EmptyGroup,

    /// Records in a group disagree on encryption, compression or chunk count.
    #[error("Memo group {group_id} has inconsistent format metadata")]
    InconsistentGroup {
        /// Logical message id.
        group_id: String,
    },

    /// Not all chunks of a message have arrived yet.
    #[error("Incomplete memo group {group_id}: have {received}/{expected} chunks")]
    IncompleteGroup {
        /// Logical message id.
        group_id: String,
        /// Distinct chunk positions present.
        received: usize,
        /// Chunk positions required.
        expected: usize,
    },

    /// The same chunk position carries two different payloads.
    #[error("Conflicting payloads for chunk {index} of memo group {group_id}")]
    ConflictingChunk {
        /// Logical message id.
        group_id: String,
        /// Chunk position.
        index: u32,
    },

    /// Encryption requested without a completed key exchange.
    #[error("Cannot encrypt message: handshake protocol not completed between {source_address} and {destination}")]
    HandshakeRequired {
        /// Sending address.
        source_address: String,
        /// Destination address that must exchange keys first.
        destination: String,
    },

    /// Structural overhead alone exceeds the transport limit.
    #[error("No space for data: transport limit {limit}, overhead {overhead}")]
    BudgetExceeded {
        /// Configured transport limit in bytes.
        limit: usize,
        /// Hex-encoded overhead in bytes.
        overhead: usize,
    },

    /// Message needs more chunks than the chunk label can express.
    #[error("Message requires {required} chunks, max {max}")]
    TooManyChunks {
        /// Chunks needed.
        required: usize,
        /// Configured maximum.
        max: usize,
    },

    /// Task id does not match the timestamp pattern.
    #[error("Invalid task id: {0}")]
    InvalidTaskId(String),

    /// Task message id carries an unknown type suffix.
    #[error("Unknown task type in memo id: {0}")]
    UnknownTaskType(String),

    /// No request message found for a task.
    #[error("No TASK_REQUEST found for task {0}")]
    MissingTaskRequest(String),

    /// Configuration values are unusable.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Wallet state guard refused the operation.
    #[error(transparent)]
    NotReady(#[from] NotReadyError),

    /// Compression failure.
    #[error("Compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Cryptographic failure.
    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Payload serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl MemoError {
    /// True for conditions a caller should retry later rather than treat as
    /// corruption: incomplete chunk sets, missing handshakes, wallet state.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            MemoError::IncompleteGroup { .. }
                | MemoError::HandshakeRequired { .. }
                | MemoError::NotReady(_)
        )
    }
}

/// Result type for memo protocol operations.
pub type Result<T> = std::result::Result<T, MemoError>;
