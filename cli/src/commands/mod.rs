//! Subcommand implementations

pub mod decode;
pub mod encode;
pub mod estimate;
pub mod handshake;
pub mod info;
pub mod init_config;
pub mod tasks;

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use colored::Colorize;
use pf_memo::MemoContent;

/// Message text from the positional argument or a file
pub fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    match (text, file) {
        (Some(_), Some(_)) => bail!("Pass the message as an argument or with --file, not both"),
        (Some(text), None) => Ok(text),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read message file {}", path.display())),
        (None, None) => bail!("No message given. Pass it as an argument or with --file"),
    }
}

/// Print a value as pretty JSON
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Colored label for a decoded message body
pub fn content_label(content: &MemoContent) -> colored::ColoredString {
    match content {
        MemoContent::Plain(_) => "PLAIN".green(),
        MemoContent::Decrypted(_) => "DECRYPTED".green().bold(),
        MemoContent::Encrypted(_) => "ENCRYPTED".yellow(),
        MemoContent::DecryptionFailed(_) => "DECRYPTION FAILED".red(),
    }
}
