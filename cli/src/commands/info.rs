//! Show configuration and wallet onboarding state

use std::path::Path;

use anyhow::{bail, Result};
use colored::Colorize;
use pf_memo::wallet_state::WalletState;
use pf_memo::MemoEngine;

use crate::config::{load_config, pfmemo_dir, resolve_config_path};
use crate::credentials::SEED_ENV;
use crate::history::load_history;

pub fn run(
    config_path: Option<&Path>,
    history: Option<&Path>,
    wallet: Option<&str>,
    funded: bool,
    trustlined: bool,
) -> Result<()> {
    let path = resolve_config_path(config_path)?;
    let config = load_config(config_path)?;

    println!();
    println!("{}", "pfmemo Configuration".yellow().bold());
    println!();

    println!("{}:", "Config File".cyan());
    if path.exists() {
        println!("  {}", path.display());
    } else {
        println!("  {} {}", path.display(), "(not found, using defaults)".dimmed());
        println!("  Run 'pfmemo init-config' to create it");
    }
    println!();

    println!("{}:", "Transport".cyan());
    println!("  Limit:        {} bytes (hex)", config.transport_limit);
    println!("  Overhead:     {} bytes", config.structural_overhead);
    println!("  Version:      v{}", config.protocol_version);
    println!("  Max chunks:   {}", config.max_chunks);
    println!("  Compression:  brotli quality {}", config.compression_level);
    println!();

    println!("{}:", "Addresses".cyan());
    let show = |label: &str, address: &Option<String>| match address {
        Some(address) => println!("  {:<13} {}", label, address),
        None => println!("  {:<13} {}", label, "NOT CONFIGURED".dimmed()),
    };
    show("Node:", &config.node_address);
    show("Remembrancer:", &config.remembrancer_address);
    show("Issuer:", &config.issuer_address);
    println!();

    println!("{}:", "Wallet Seed".cyan());
    if std::env::var(SEED_ENV).is_ok() {
        println!("  {} set", SEED_ENV);
    } else {
        println!("  {} not set, seed will be prompted for", SEED_ENV);
    }
    println!();

    match (history, wallet) {
        (Some(history), Some(wallet)) => {
            let engine = MemoEngine::new(config)?;
            let transactions = engine.ingest(&load_history(history)?);
            let state = engine.wallet_state(wallet, &transactions, funded, trustlined);

            let label = if state == WalletState::Active {
                state.to_string().green().bold()
            } else {
                state.to_string().yellow()
            };
            println!("{}:", "Wallet State".cyan());
            println!("  {} [{}]", wallet, label);
            println!("  Next step: {}", state.required_action());
            println!();
        }
        (Some(_), None) | (None, Some(_)) => bail!("--history and --wallet go together"),
        (None, None) => {}
    }

    println!("{}:", "File Locations".cyan());
    println!("  Directory: {}", pfmemo_dir()?.display());

    Ok(())
}
