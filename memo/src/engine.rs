//! Engine facade
//!
//! `MemoEngine` owns the protocol configuration and the handshake registry
//! and wires the pipeline stages together. Decoding a history slice never
//! fails as a whole: each message carries its own outcome.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::ProtocolConfig;
use crate::construction::{construct_group, estimate_chunks, MemoConstructionParams, OutboundGroup};
use crate::crypto::CredentialProvider;
use crate::error::Result;
use crate::group::{groups_from_history, parse_group, DecryptionContext, MemoContent};
use crate::handshake::{HandshakeRegistry, HandshakeStatus, HandshakeSummary};
use crate::ledger::{LedgerSubmitter, PaymentRequest, SubmissionResult, TokenRequirements};
use crate::record::{decode_records, Memo, MemoTransaction, TransactionRecord};
use crate::system::{handshake_memo, is_system_memo_type};
use crate::task::{reconstruct_tasks, Task, TaskMessage};
use crate::wallet_state::{WalletFacts, WalletState};

/// Result of decoding one message group
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DecodeOutcome {
    Ok { content: MemoContent },
    /// Decoding failed; `not_ready` marks failures that more history can fix
    Failed { error: String, not_ready: bool },
}

impl DecodeOutcome {
    pub fn content(&self) -> Option<&MemoContent> {
        match self {
            DecodeOutcome::Ok { content } => Some(content),
            DecodeOutcome::Failed { .. } => None,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, DecodeOutcome::Ok { .. })
    }
}

/// One decoded message of a history slice
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedMessage {
    pub group_id: String,
    /// Sender of the first chunk
    pub account: String,
    pub destination: String,
    /// Latest chunk timestamp
    pub timestamp: DateTime<Utc>,
    pub chunk_count: usize,
    /// Tokens delivered across all chunks
    pub amount: f64,
    pub outcome: DecodeOutcome,
}

impl DecodedMessage {
    pub fn is_system(&self) -> bool {
        is_system_memo_type(&self.group_id)
    }
}

/// Protocol engine
#[derive(Debug, Clone)]
pub struct MemoEngine {
    config: ProtocolConfig,
    registry: Arc<HandshakeRegistry>,
}

impl MemoEngine {
    pub fn new(config: ProtocolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            registry: Arc::new(HandshakeRegistry::new()),
        })
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn registry(&self) -> &HandshakeRegistry {
        &self.registry
    }

    pub fn token_requirements(&self) -> TokenRequirements {
        TokenRequirements::from_config(&self.config)
    }

    /// Decode successful records and feed their handshakes to the registry.
    pub fn ingest(&self, records: &[TransactionRecord]) -> Vec<MemoTransaction> {
        let transactions = decode_records(records, &self.config.success_code);
        let added = self.registry.ingest(&transactions);
        debug!(
            records = records.len(),
            transactions = transactions.len(),
            handshakes = added,
            "Ingested history"
        );
        transactions
    }

    pub fn handshake_status(&self, channel: &str, counterparty: &str) -> HandshakeStatus {
        self.registry.get_handshake(channel, counterparty)
    }

    pub fn handshake_summaries(&self, channel: &str) -> Vec<HandshakeSummary> {
        self.registry.summaries(channel)
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    pub fn construct(
        &self,
        params: &MemoConstructionParams,
        credentials: &dyn CredentialProvider,
    ) -> Result<OutboundGroup> {
        construct_group(params, &self.registry, credentials, &self.config)
    }

    pub fn estimate_chunks(
        &self,
        text: &str,
        encrypt: bool,
        compress: bool,
        memo_type: Option<&str>,
    ) -> Result<usize> {
        estimate_chunks(text, encrypt, compress, memo_type, &self.config)
    }

    /// Handshake memo publishing this wallet's key.
    pub fn handshake_memo(&self, username: &str, credentials: &dyn CredentialProvider) -> Memo {
        handshake_memo(username, &credentials.public_key_hex())
    }

    /// Refuse to send `params` from a wallet in `state` if the message needs
    /// a later onboarding state.
    pub fn authorize(&self, params: &MemoConstructionParams, state: WalletState) -> Result<()> {
        let (required, operation) = WalletState::required_to_send(
            params.memo_type.as_deref().unwrap_or_default(),
            &params.destination,
            self.config.node_address.as_deref(),
        );
        state.require(required, operation)?;
        Ok(())
    }

    /// Build a message and the payments carrying it, with the destination's
    /// token requirement attached to every chunk.
    ///
    /// `state` is the sender's onboarding state; see [`MemoEngine::authorize`].
    pub fn prepare_payments(
        &self,
        params: &MemoConstructionParams,
        state: WalletState,
        credentials: &dyn CredentialProvider,
    ) -> Result<Vec<PaymentRequest>> {
        self.authorize(params, state)?;
        let group = self.construct(params, credentials)?;
        let amount = self
            .token_requirements()
            .requirement(&group.destination, &group.group_id);
        Ok(group.payment_requests(amount))
    }

    /// Submit every chunk of a message in order.
    ///
    /// Submission stops at the first error. Non-success result codes are
    /// returned to the caller, who decides whether to retry.
    pub fn send(
        &self,
        params: &MemoConstructionParams,
        state: WalletState,
        credentials: &dyn CredentialProvider,
        submitter: &dyn LedgerSubmitter,
    ) -> Result<Vec<SubmissionResult>> {
        let requests = self.prepare_payments(params, state, credentials)?;
        let mut results = Vec::with_capacity(requests.len());
        for (i, request) in requests.iter().enumerate() {
            let result = submitter.submit(request)?;
            if !result.is_success(&self.config.success_code) {
                warn!(
                    chunk = i + 1,
                    total = requests.len(),
                    result_code = %result.result_code,
                    "Chunk submission was not applied"
                );
            }
            results.push(result);
        }
        info!(chunks = results.len(), destination = %params.destination, "Submitted message");
        Ok(results)
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    /// Decode every message group in `records`, most recently active first.
    ///
    /// Without credentials, encrypted messages come back as ciphertext.
    pub fn decode_history(
        &self,
        records: &[TransactionRecord],
        wallet_address: &str,
        credentials: Option<&dyn CredentialProvider>,
    ) -> Vec<DecodedMessage> {
        let transactions = self.ingest(records);
        self.decode_transactions(&transactions, wallet_address, credentials)
    }

    /// Decode already ingested transactions.
    pub fn decode_transactions(
        &self,
        transactions: &[MemoTransaction],
        wallet_address: &str,
        credentials: Option<&dyn CredentialProvider>,
    ) -> Vec<DecodedMessage> {
        let ctx = credentials.map(|credentials| DecryptionContext {
            wallet_address,
            registry: &self.registry,
            credentials,
        });

        groups_from_history(transactions, false)
            .into_iter()
            .map(|group| {
                let outcome = match parse_group(&group, ctx.is_some(), ctx.as_ref(), &self.config) {
                    Ok(content) => DecodeOutcome::Ok { content },
                    Err(e) => {
                        warn!(group_id = %group.group_id(), error = %e, "Failed to decode message");
                        DecodeOutcome::Failed {
                            error: e.to_string(),
                            not_ready: e.is_not_ready(),
                        }
                    }
                };
                let first = group.first();
                DecodedMessage {
                    group_id: group.group_id().to_string(),
                    account: first.account.clone(),
                    destination: first.destination.clone(),
                    timestamp: group.latest_timestamp(),
                    chunk_count: group.transactions().len(),
                    amount: group.total_delivered_amount(),
                    outcome,
                }
            })
            .collect()
    }

    /// Rebuild tasks from decoded messages.
    ///
    /// Messages whose id carries no task suffix or whose body is not
    /// readable are skipped.
    pub fn reconstruct_tasks(&self, messages: &[DecodedMessage]) -> BTreeMap<String, Result<Task>> {
        let task_messages: Vec<TaskMessage> = messages
            .iter()
            .filter_map(|message| {
                let content = message.outcome.content().filter(|c| c.is_readable())?;
                TaskMessage::from_decoded(
                    &message.group_id,
                    message.timestamp,
                    content.text(),
                    message.amount,
                )
                .ok()
            })
            .collect();
        reconstruct_tasks(&task_messages)
    }

    /// Onboarding state of `wallet_address` against the configured node.
    ///
    /// Without a configured node only the ledger facts count.
    pub fn wallet_state(
        &self,
        wallet_address: &str,
        transactions: &[MemoTransaction],
        funded: bool,
        trustlined: bool,
    ) -> WalletState {
        let facts = match &self.config.node_address {
            Some(node) => WalletFacts::observe(wallet_address, node, transactions, funded, trustlined),
            None => WalletFacts {
                funded,
                trustlined,
                ..WalletFacts::default()
            },
        };
        WalletState::from_facts(&facts)
    }
}
