//! Show the handshake memo and handshake state

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use pf_memo::MemoEngine;
use serde::Serialize;

use crate::commands::print_json;
use crate::config::load_config;
use crate::credentials::load_wallet_keys;
use crate::history::load_history;

#[derive(Serialize)]
struct HandshakeReport {
    public_key: String,
    memo: pf_memo::EncodedMemo,
    counterparties: Vec<pf_memo::handshake::HandshakeSummary>,
}

pub fn run(
    config_path: Option<&Path>,
    username: &str,
    history: Option<&Path>,
    wallet: Option<&str>,
    json: bool,
) -> Result<()> {
    let engine = MemoEngine::new(load_config(config_path)?)?;
    let keys = load_wallet_keys()?;
    let memo = engine.handshake_memo(username, &keys);

    let counterparties = match (history, wallet) {
        (Some(path), Some(wallet)) => {
            engine.ingest(&load_history(path)?);
            engine.handshake_summaries(wallet)
        }
        (Some(_), None) => bail!("--history needs --wallet"),
        _ => Vec::new(),
    };

    let report = HandshakeReport {
        public_key: keys.public_key_hex(),
        memo: memo.encode(),
        counterparties,
    };

    if json {
        return print_json(&report);
    }

    println!();
    println!("{}", "Handshake Memo".yellow().bold());
    println!("  Public key: {}", report.public_key);
    println!("  MemoFormat: {}", report.memo.format_hex);
    println!("  MemoType:   {}", report.memo.type_hex);
    println!("  MemoData:   {}", report.memo.data_hex);
    println!();

    if history.is_none() {
        return Ok(());
    }

    if report.counterparties.is_empty() {
        println!("{}", "No handshakes found.".yellow());
        return Ok(());
    }

    println!("{}:", "Counterparties".cyan());
    for summary in &report.counterparties {
        let status = if summary.encryption_ready {
            "READY".green()
        } else if summary.received_at.is_some() {
            "RECEIVED".yellow()
        } else {
            "SENT".yellow()
        };
        println!("  {} [{}]", summary.counterparty, status);
        if let Some(sent) = summary.sent_at {
            println!("    Sent:     {}", sent.format("%Y-%m-%d %H:%M"));
        }
        if let Some(received) = summary.received_at {
            println!("    Received: {}", received.format("%Y-%m-%d %H:%M"));
        }
    }

    Ok(())
}
