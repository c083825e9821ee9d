//! Wallet seed input

use anyhow::{Context, Result};
use pf_memo::WalletKeys;
use zeroize::Zeroize;

/// Environment variable holding the wallet seed
pub const SEED_ENV: &str = "PFMEMO_SEED";

/// Load wallet keys from `PFMEMO_SEED`, or prompt for the seed (hides input)
pub fn load_wallet_keys() -> Result<WalletKeys> {
    let mut seed = match std::env::var(SEED_ENV) {
        Ok(seed) => seed,
        Err(_) => rpassword::prompt_password("Enter wallet seed: ")
            .context("Failed to read wallet seed")?,
    };

    let keys = WalletKeys::from_seed(&seed).context("Invalid wallet seed");
    seed.zeroize();
    keys
}
