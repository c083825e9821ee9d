//! Decode the messages in a transaction history

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;
use pf_memo::{CredentialProvider, DecodeOutcome, MemoEngine};

use crate::commands::{content_label, print_json};
use crate::config::load_config;
use crate::credentials::load_wallet_keys;
use crate::history::load_history;

pub struct DecodeOptions {
    pub history: PathBuf,
    pub wallet: String,
    pub decrypt: bool,
    pub limit: Option<usize>,
    pub system: bool,
    pub json: bool,
}

pub fn run(config_path: Option<&Path>, opts: DecodeOptions) -> Result<()> {
    let engine = MemoEngine::new(load_config(config_path)?)?;
    let records = load_history(&opts.history)?;

    let keys = if opts.decrypt {
        Some(load_wallet_keys()?)
    } else {
        None
    };
    let credentials = keys.as_ref().map(|k| k as &dyn CredentialProvider);

    let mut messages: Vec<_> = engine
        .decode_history(&records, &opts.wallet, credentials)
        .into_iter()
        .filter(|m| opts.system || !m.is_system())
        .filter(|m| m.account == opts.wallet || m.destination == opts.wallet)
        .collect();
    if let Some(limit) = opts.limit {
        messages.truncate(limit);
    }

    if opts.json {
        return print_json(&messages);
    }

    if messages.is_empty() {
        println!("{}", "No messages found.".yellow());
        return Ok(());
    }

    println!();
    println!(
        "{}",
        format!("{} message(s) for {}:", messages.len(), opts.wallet)
            .green()
            .bold()
    );
    println!();

    for (i, message) in messages.iter().enumerate() {
        let direction = if message.account == opts.wallet {
            format!("to {}", message.destination)
        } else {
            format!("from {}", message.account)
        };

        match &message.outcome {
            DecodeOutcome::Ok { content } => {
                println!("{}. {} [{}]", i + 1, message.group_id.cyan(), content_label(content));
                println!("   {}  {}", message.timestamp.format("%Y-%m-%d %H:%M"), direction);
                if message.amount > 0.0 {
                    println!("   Tokens: {}", message.amount);
                }
                println!("   {}", content);
            }
            DecodeOutcome::Failed { error, not_ready } => {
                let status = if *not_ready {
                    "PENDING".yellow()
                } else {
                    "ERROR".red()
                };
                println!("{}. {} [{}]", i + 1, message.group_id.cyan(), status);
                println!("   {}  {}", message.timestamp.format("%Y-%m-%d %H:%M"), direction);
                println!("   {}", error.dimmed());
            }
        }
        println!();
    }

    Ok(())
}
