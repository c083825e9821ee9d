//! System memos
//!
//! Memos whose type is a fixed tag instead of a message id. They are sent
//! as a single unchunked record with the sender's username as the format.

use serde::{Deserialize, Serialize};

use crate::error::{MemoError, Result};
use crate::record::Memo;

pub const HANDSHAKE_MEMO_TYPE: &str = "HANDSHAKE";
pub const INITIATION_RITE_MEMO_TYPE: &str = "INITIATION_RITE";
pub const CONTEXT_DOC_LINK_MEMO_TYPE: &str = "google_doc_context_link";

/// Fixed-tag memo kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SystemMemoType {
    Handshake,
    InitiationRite,
    ContextDocLink,
}

impl SystemMemoType {
    pub const ALL: [SystemMemoType; 3] = [
        SystemMemoType::Handshake,
        SystemMemoType::InitiationRite,
        SystemMemoType::ContextDocLink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SystemMemoType::Handshake => HANDSHAKE_MEMO_TYPE,
            SystemMemoType::InitiationRite => INITIATION_RITE_MEMO_TYPE,
            SystemMemoType::ContextDocLink => CONTEXT_DOC_LINK_MEMO_TYPE,
        }
    }

    pub fn from_memo_type(memo_type: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == memo_type)
    }
}

impl std::fmt::Display for SystemMemoType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether `memo_type` is one of the system tags.
pub fn is_system_memo_type(memo_type: &str) -> bool {
    SystemMemoType::from_memo_type(memo_type).is_some()
}

/// Handshake memo publishing `public_key_hex` to a counterparty.
pub fn handshake_memo(username: &str, public_key_hex: &str) -> Memo {
    Memo::new(username, HANDSHAKE_MEMO_TYPE, public_key_hex)
}

/// Context document link memo.
pub fn context_doc_link_memo(username: &str, url: &str) -> Memo {
    Memo::new(username, CONTEXT_DOC_LINK_MEMO_TYPE, url)
}

pub const INITIATION_RITE_VERSION: &str = "1.0";

/// Body of an initiation rite memo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitiationRitePayload {
    pub username: String,
    pub commitment: String,
    pub version: String,
}

impl InitiationRitePayload {
    pub fn new(username: impl Into<String>, commitment: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            commitment: commitment.into(),
            version: INITIATION_RITE_VERSION.to_string(),
        }
    }

    /// Parse a rite body. Older wallets sent the bare commitment text.
    pub fn parse(username: &str, data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|_| Self {
            username: username.to_string(),
            commitment: data.to_string(),
            version: "0".to_string(),
        })
    }

    pub fn to_memo(&self) -> Result<Memo> {
        let body = serde_json::to_string(self)
            .map_err(|e| MemoError::Serialization(e.to_string()))?;
        Ok(Memo::new(&self.username, INITIATION_RITE_MEMO_TYPE, body))
    }
}
