//! Configuration storage for the pfmemo CLI

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pf_memo::ProtocolConfig;
use tracing::debug;

/// Default directory for pfmemo files
const PFMEMO_DIR: &str = ".pfmemo";
const CONFIG_FILE: &str = "config.json";

/// Get the pfmemo directory path
pub fn pfmemo_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(PFMEMO_DIR))
        .context("Could not find home directory")
}

/// Get the default config file path
pub fn default_config_file() -> Result<PathBuf> {
    Ok(pfmemo_dir()?.join(CONFIG_FILE))
}

/// Resolve an explicit path or fall back to the default location
pub fn resolve_config_path(path: Option<&Path>) -> Result<PathBuf> {
    match path {
        Some(p) => Ok(p.to_path_buf()),
        None => default_config_file(),
    }
}

/// Load and validate the configuration. A missing file yields the defaults.
pub fn load_config(path: Option<&Path>) -> Result<ProtocolConfig> {
    let path = resolve_config_path(path)?;
    if !path.exists() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(ProtocolConfig::default());
    }

    let json = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let config: ProtocolConfig = serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse config file {}", path.display()))?;
    config.validate().context("Invalid configuration")?;

    Ok(config)
}

/// Save the configuration to disk
pub fn save_config(config: &ProtocolConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }
    config.validate().context("Refusing to save an invalid configuration")?;

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).context("Failed to create config directory")?;
    }
    let json = serde_json::to_string_pretty(config)?;

    // Set restrictive permissions on Unix
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::write(path, &json)?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }

    #[cfg(not(unix))]
    {
        fs::write(path, &json)?;
    }

    Ok(())
}
