//! Post Fiat memo protocol engine
//!
//! Transports arbitrary-length, optionally compressed and encrypted messages
//! as sequences of small ledger memos, and reconstructs messages and task
//! lifecycles from an unordered transaction history.
//!
//! Outbound: encrypt → compress → chunk → hex-encode.
//! Inbound: group → unchunk → decompress → decrypt.

pub mod chunking;
pub mod compression;
pub mod config;
pub mod construction;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod group;
pub mod handshake;
pub mod ledger;
pub mod legacy;
pub mod record;
pub mod size;
pub mod structure;
pub mod system;
pub mod task;
pub mod wallet_state;

pub use config::ProtocolConfig;
pub use construction::{MemoConstructionParams, OutboundGroup};
pub use crypto::{CredentialProvider, SharedSecret, WalletKeys};
pub use engine::{DecodeOutcome, DecodedMessage, MemoEngine};
pub use error::{CompressionError, CryptoError, MemoError, NotReadyError, Result};
pub use group::{DecryptionContext, MemoContent, MemoGroup};
pub use handshake::{HandshakeRegistry, HandshakeStatus};
pub use record::{EncodedMemo, Memo, MemoTransaction, TransactionRecord};
pub use structure::{CompressionKind, EncryptionKind, MemoStructure};
pub use task::{Task, TaskMessage, TaskType};
pub use wallet_state::{WalletFacts, WalletState};


#[cfg(test)]
mod test_vectors;
