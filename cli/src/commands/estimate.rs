//! Predict chunk counts

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use pf_memo::MemoEngine;

use crate::config::load_config;

pub fn run(config_path: Option<&Path>, text: &str, encrypt: bool, compress: bool) -> Result<()> {
    let engine = MemoEngine::new(load_config(config_path)?)?;
    let chunks = engine.estimate_chunks(text, encrypt, compress, None)?;

    println!(
        "{} bytes → {} memo(s) at a {} byte limit",
        text.len(),
        chunks.to_string().green().bold(),
        engine.config().transport_limit
    );
    if !compress && chunks > 1 {
        let compressed = engine.estimate_chunks(text, encrypt, true, None)?;
        if compressed < chunks {
            println!(
                "{}",
                format!("With --compress: {} memo(s)", compressed).dimmed()
            );
        }
    }

    Ok(())
}
