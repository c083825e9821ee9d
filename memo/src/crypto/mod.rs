//! Cryptographic operations for memo channels
//!
//! - XRPL ed25519 key derivation from wallet seeds
//! - ed25519 → X25519 conversion and ECDH shared secrets
//! - Authenticated symmetric encryption of memo payloads
//!
//! Secret material is zeroized on drop.

mod cipher;
mod ecdh;
mod keys;

pub use cipher::{decrypt, encrypt, encrypt_with_throwaway_key, TOKEN_VERSION};
pub use ecdh::{
    derive_shared_secret, edwards_to_montgomery, strip_key_prefix, x25519_secret, SharedSecret,
};
pub use keys::{decode_seed, encode_seed, WalletKeys, ED25519_KEY_PREFIX};

use crate::error::CryptoError;

/// Credential collaborator.
///
/// The engine never reads the credential store directly; it asks the
/// provider for this wallet's handshake key and for per-counterparty secrets.
pub trait CredentialProvider: Send + Sync {
    /// `ED`-prefixed public key published in handshakes.
    fn public_key_hex(&self) -> String;

    /// ECDH shared secret with the holder of `their_public_key_hex`.
    fn shared_secret(&self, their_public_key_hex: &str) -> Result<SharedSecret, CryptoError>;
}

/// Derive the shared secret between `their_public_key_hex` and the wallet
/// identified by `our_seed`.
pub fn get_shared_secret(
    their_public_key_hex: &str,
    our_seed: &str,
) -> Result<SharedSecret, CryptoError> {
    WalletKeys::from_seed(our_seed)?.shared_secret(their_public_key_hex)
}
