//! Build the memos for a message

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use pf_memo::{MemoConstructionParams, MemoEngine, WalletKeys};

use crate::commands::print_json;
use crate::config::load_config;
use crate::credentials::load_wallet_keys;
use crate::history::load_history;

pub struct EncodeOptions {
    pub text: String,
    pub from: String,
    pub to: String,
    pub encrypt: bool,
    pub compress: bool,
    pub memo_type: Option<String>,
    pub history: Option<PathBuf>,
    pub json: bool,
}

pub fn run(config_path: Option<&Path>, opts: EncodeOptions) -> Result<()> {
    let engine = MemoEngine::new(load_config(config_path)?)?;

    // An exported history implies a funded account with a trust line; the
    // memo facts come from the history itself.
    let state = match &opts.history {
        Some(path) => {
            let transactions = engine.ingest(&load_history(path)?);
            Some(engine.wallet_state(&opts.from, &transactions, true, true))
        }
        None => None,
    };

    // Keys are only needed for the channel secret
    let keys = if opts.encrypt {
        load_wallet_keys()?
    } else {
        WalletKeys::generate().context("Failed to generate throwaway keys")?
    };

    let mut params = MemoConstructionParams::new(opts.text, &opts.from, &opts.to)
        .encrypted(opts.encrypt)
        .compressed(opts.compress);
    if let Some(memo_type) = opts.memo_type {
        params = params.with_memo_type(memo_type);
    }

    if let Some(state) = state {
        engine
            .authorize(&params, state)
            .map_err(|e| anyhow::anyhow!("{}. Next step: {}", e, state.required_action()))?;
    }

    let group = engine.construct(&params, &keys).map_err(|e| {
        if e.is_not_ready() {
            anyhow::anyhow!("{}. Exchange handshakes first and pass --history.", e)
        } else {
            e.into()
        }
    })?;

    let amount = engine
        .token_requirements()
        .requirement(&group.destination, &group.group_id);
    let payments = group.payment_requests(amount);

    if opts.json {
        return print_json(&payments);
    }

    println!();
    println!("{}", "Memo Group".yellow().bold());
    println!("  Message id: {}", group.group_id);
    println!("  From:       {}", group.source);
    println!("  To:         {}", group.destination);
    println!("  Chunks:     {}", group.len());
    if amount > 0.0 {
        println!("  Tokens:     {} per chunk", amount);
    }
    println!();

    for (memo, payment) in group.memos.iter().zip(&payments) {
        println!("{}", memo.format.cyan());
        println!("  MemoFormat: {}", payment.memo.format_hex);
        println!("  MemoType:   {}", payment.memo.type_hex);
        println!("  MemoData:   {}", payment.memo.data_hex);
        println!();
    }

    Ok(())
}
