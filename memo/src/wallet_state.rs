//! Wallet onboarding state
//!
//! A wallet moves from unfunded to active through a fixed sequence of
//! ledger and system-memo steps. Operations that need a minimum state call
//! [`WalletState::require`] and get a typed [`NotReadyError`] back.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::NotReadyError;
use crate::record::MemoTransaction;
use crate::system::SystemMemoType;
use crate::task::parse_task_message_id;

/// Onboarding states, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletState {
    /// Address not activated on the ledger
    Unfunded,
    Funded,
    /// Trust line to the task token set
    Trustlined,
    /// Initiation rite sent to the node
    Initiated,
    /// Handshake sent, waiting for the node's key
    HandshakeSent,
    /// Node key received, waiting for the context document link
    HandshakeReceived,
    Active,
}

impl WalletState {
    pub fn as_str(&self) -> &'static str {
        match self {
            WalletState::Unfunded => "unfunded",
            WalletState::Funded => "funded",
            WalletState::Trustlined => "trustlined",
            WalletState::Initiated => "initiated",
            WalletState::HandshakeSent => "handshake_sent",
            WalletState::HandshakeReceived => "handshake_received",
            WalletState::Active => "active",
        }
    }

    /// Next step needed to unlock the wallet.
    pub fn required_action(&self) -> &'static str {
        match self {
            WalletState::Unfunded => "Fund wallet with XRP",
            WalletState::Funded => "Set PFT trust line",
            WalletState::Trustlined => "Send initiation rite",
            WalletState::Initiated => "Send handshake to node",
            WalletState::HandshakeSent => "Wait for the node's handshake",
            WalletState::HandshakeReceived => "Send context document link",
            WalletState::Active => "No action required, wallet is fully initialized",
        }
    }

    /// Fail unless this state is at least `required`.
    pub fn require(&self, required: WalletState, operation: &str) -> Result<(), NotReadyError> {
        if *self >= required {
            Ok(())
        } else {
            Err(NotReadyError {
                operation: operation.to_string(),
                required,
                actual: *self,
            })
        }
    }

    /// Minimum state for sending a memo of `memo_type` to `destination`,
    /// with the operation name used in the refusal.
    ///
    /// System memos follow the onboarding order. Task messages addressed to
    /// the node need an active wallet; any other memo needs a funded account.
    pub fn required_to_send(
        memo_type: &str,
        destination: &str,
        node_address: Option<&str>,
    ) -> (WalletState, &'static str) {
        match SystemMemoType::from_memo_type(memo_type) {
            Some(SystemMemoType::Handshake) => (WalletState::Funded, "send a handshake"),
            Some(SystemMemoType::InitiationRite) => {
                (WalletState::Trustlined, "send the initiation rite")
            }
            Some(SystemMemoType::ContextDocLink) => {
                (WalletState::Initiated, "send the context document link")
            }
            None if node_address == Some(destination)
                && parse_task_message_id(memo_type).is_ok() =>
            {
                (WalletState::Active, "send task messages to the node")
            }
            None => (WalletState::Funded, "send memos"),
        }
    }

    /// Derive the state from observed onboarding facts.
    pub fn from_facts(facts: &WalletFacts) -> Self {
        if !facts.funded {
            WalletState::Unfunded
        } else if !facts.trustlined {
            WalletState::Funded
        } else if !facts.initiation_rite_sent {
            WalletState::Trustlined
        } else if !facts.handshake_sent {
            WalletState::Initiated
        } else if !facts.handshake_received {
            WalletState::HandshakeSent
        } else if !facts.context_doc_sent {
            WalletState::HandshakeReceived
        } else {
            WalletState::Active
        }
    }
}

impl fmt::Display for WalletState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observed onboarding facts for one wallet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletFacts {
    pub funded: bool,
    pub trustlined: bool,
    pub initiation_rite_sent: bool,
    pub handshake_sent: bool,
    pub handshake_received: bool,
    pub context_doc_sent: bool,
}

impl WalletFacts {
    /// Collect the memo-based facts from history. Funding and trust line
    /// come from account queries and are passed in.
    pub fn observe(
        wallet_address: &str,
        node_address: &str,
        transactions: &[MemoTransaction],
        funded: bool,
        trustlined: bool,
    ) -> Self {
        let sent = |kind: SystemMemoType| {
            transactions.iter().any(|tx| {
                tx.account == wallet_address
                    && tx.destination == node_address
                    && tx.memo.memo_type == kind.as_str()
            })
        };
        let handshake_received = transactions.iter().any(|tx| {
            tx.account == node_address
                && tx.destination == wallet_address
                && tx.memo.memo_type == SystemMemoType::Handshake.as_str()
        });

        Self {
            funded,
            trustlined,
            initiation_rite_sent: sent(SystemMemoType::InitiationRite),
            handshake_sent: sent(SystemMemoType::Handshake),
            handshake_received,
            context_doc_sent: sent(SystemMemoType::ContextDocLink),
        }
    }
}
