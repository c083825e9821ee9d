//! Write a configuration file

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use pf_memo::ProtocolConfig;

use crate::config::{resolve_config_path, save_config};

pub struct InitOptions {
    pub force: bool,
    pub conservative: bool,
    pub node: Option<String>,
    pub remembrancer: Option<String>,
    pub issuer: Option<String>,
}

/// Build the configuration described by the options
pub fn build_config(opts: InitOptions) -> ProtocolConfig {
    let base = if opts.conservative {
        ProtocolConfig::conservative()
    } else {
        ProtocolConfig::default()
    };
    ProtocolConfig {
        node_address: opts.node,
        remembrancer_address: opts.remembrancer,
        issuer_address: opts.issuer,
        ..base
    }
}

pub fn run(config_path: Option<&Path>, opts: InitOptions) -> Result<()> {
    let path = resolve_config_path(config_path)?;
    let force = opts.force;
    let config = build_config(opts);

    save_config(&config, &path, force)?;

    println!("{}", "Configuration written".green().bold());
    println!("  {}", path.display());
    println!("  Transport limit: {} bytes", config.transport_limit);

    Ok(())
}
