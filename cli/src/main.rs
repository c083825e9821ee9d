//! pfmemo - Command line interface for the Post Fiat memo protocol

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

mod commands;
mod config;
mod credentials;
mod history;


use commands::*;

#[derive(Parser)]
#[command(name = "pfmemo")]
#[command(version = "0.1.0")]
#[command(about = "Post Fiat memo protocol - chunked, compressed and encrypted ledger memos")]
#[command(long_about = r#"
pfmemo builds and reads Post Fiat memos.

Messages longer than one ledger memo are split into labeled chunks,
optionally compressed and encrypted for a counterparty you have exchanged
handshakes with. History is read from JSON exports of ledger transactions.

Quick Start:
  1. pfmemo init-config                      Write a default configuration
  2. pfmemo handshake --username alice       Print your handshake memo
  3. pfmemo encode "hello" --from rA --to rB Build the memos for a message
  4. pfmemo decode --history tx.json --wallet rB
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (default: ~/.pfmemo/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the memos for a message
    Encode {
        /// Message text (or use --file)
        text: Option<String>,

        /// Read the message from a file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Sending address
        #[arg(long)]
        from: String,

        /// Destination address
        #[arg(long)]
        to: String,

        /// Encrypt for the destination (needs a completed handshake)
        #[arg(short, long)]
        encrypt: bool,

        /// Compress the payload
        #[arg(short, long)]
        compress: bool,

        /// Message id (generated when omitted)
        #[arg(long)]
        memo_type: Option<String>,

        /// Transaction history used to find handshakes
        #[arg(long)]
        history: Option<PathBuf>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Decode the messages in a transaction history
    Decode {
        /// JSON file with raw transaction records
        #[arg(long)]
        history: PathBuf,

        /// Wallet whose messages are decoded
        #[arg(long)]
        wallet: String,

        /// Decrypt with the wallet seed
        #[arg(short, long)]
        decrypt: bool,

        /// Show only the N most recent messages
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Include handshake and onboarding memos
        #[arg(long)]
        system: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Predict how many memos a message needs
    Estimate {
        /// Message text (or use --file)
        text: Option<String>,

        /// Read the message from a file
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(short, long)]
        encrypt: bool,

        #[arg(short, long)]
        compress: bool,
    },

    /// Show your handshake memo and handshake state with counterparties
    Handshake {
        /// Username written into the memo format field
        #[arg(short, long)]
        username: String,

        /// Transaction history to report handshake state from
        #[arg(long)]
        history: Option<PathBuf>,

        /// Wallet address to report for (with --history)
        #[arg(long)]
        wallet: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Rebuild task state from a transaction history
    Tasks {
        /// JSON file with raw transaction records
        #[arg(long)]
        history: PathBuf,

        /// Wallet whose tasks are shown
        #[arg(long)]
        wallet: String,

        /// Decrypt with the wallet seed
        #[arg(short, long)]
        decrypt: bool,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show configuration and wallet onboarding state
    Info {
        /// JSON file with raw transaction records
        #[arg(long)]
        history: Option<PathBuf>,

        /// Wallet address (with --history)
        #[arg(long)]
        wallet: Option<String>,

        /// Wallet holds XRP
        #[arg(long)]
        funded: bool,

        /// Wallet has a PFT trust line
        #[arg(long)]
        trustlined: bool,
    },

    /// Write a configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,

        /// Use the conservative 760 byte transport limit
        #[arg(long)]
        conservative: bool,

        /// Task node address
        #[arg(long)]
        node: Option<String>,

        /// Remembrancer address
        #[arg(long)]
        remembrancer: Option<String>,

        /// Token issuer address
        #[arg(long)]
        issuer: Option<String>,
    },
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("{0},pf_memo={0}", level)))
        .context("Invalid log filter")?;

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Encode {
            text,
            file,
            from,
            to,
            encrypt,
            compress,
            memo_type,
            history,
            json,
        } => {
            encode::run(
                config_path,
                encode::EncodeOptions {
                    text: read_text(text, file.as_deref())?,
                    from,
                    to,
                    encrypt,
                    compress,
                    memo_type,
                    history,
                    json,
                },
            )?;
        }
        Commands::Decode {
            history,
            wallet,
            decrypt,
            limit,
            system,
            json,
        } => {
            decode::run(
                config_path,
                decode::DecodeOptions {
                    history,
                    wallet,
                    decrypt,
                    limit,
                    system,
                    json,
                },
            )?;
        }
        Commands::Estimate {
            text,
            file,
            encrypt,
            compress,
        } => {
            estimate::run(config_path, &read_text(text, file.as_deref())?, encrypt, compress)?;
        }
        Commands::Handshake {
            username,
            history,
            wallet,
            json,
        } => {
            handshake::run(config_path, &username, history.as_deref(), wallet.as_deref(), json)?;
        }
        Commands::Tasks {
            history,
            wallet,
            decrypt,
            json,
        } => {
            tasks::run(config_path, &history, &wallet, decrypt, json)?;
        }
        Commands::Info {
            history,
            wallet,
            funded,
            trustlined,
        } => {
            info::run(config_path, history.as_deref(), wallet.as_deref(), funded, trustlined)?;
        }
        Commands::InitConfig {
            force,
            conservative,
            node,
            remembrancer,
            issuer,
        } => {
            init_config::run(
                config_path,
                init_config::InitOptions {
                    force,
                    conservative,
                    node,
                    remembrancer,
                    issuer,
                },
            )?;
        }
    }

    Ok(())
}
