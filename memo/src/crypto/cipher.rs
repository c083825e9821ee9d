//! Memo payload encryption
//!
//! Fernet tokens keyed by url-safe base64 of SHA-256(shared secret), the
//! channel format every Post Fiat wallet speaks. A token is
//! `0x80 || timestamp || iv || AES-128-CBC ciphertext || HMAC-SHA256`,
//! url-safe base64 encoded. Any parse or authentication failure surfaces
//! as `CryptoError::InvalidToken`.

use base64::{engine::general_purpose::URL_SAFE, Engine};
use fernet::Fernet;
use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::CryptoError;

/// Version byte leading every decoded token.
pub const TOKEN_VERSION: u8 = 0x80;

fn fernet_for(shared_secret: &[u8]) -> Result<Fernet, CryptoError> {
    let mut digest = Sha256::digest(shared_secret);
    let mut key = URL_SAFE.encode(&digest);
    let fernet = Fernet::new(&key)
        .ok_or_else(|| CryptoError::Encryption("derived key rejected".into()));
    digest.as_mut_slice().zeroize();
    key.zeroize();
    fernet
}

/// Encrypt `plaintext` under `shared_secret`.
pub fn encrypt(plaintext: &str, shared_secret: &[u8]) -> Result<String, CryptoError> {
    Ok(fernet_for(shared_secret)?.encrypt(plaintext.as_bytes()))
}

/// Decrypt a token produced by [`encrypt`] or any other Fernet encoder
/// sharing the secret. Token age is not checked.
pub fn decrypt(token: &str, shared_secret: &[u8]) -> Result<String, CryptoError> {
    let plaintext = fernet_for(shared_secret)?
        .decrypt(token.trim())
        .map_err(|_| CryptoError::InvalidToken)?;

    String::from_utf8(plaintext).map_err(|_| CryptoError::InvalidPlaintext)
}

/// Encrypt under a random key that is discarded. Gives the exact
/// ciphertext length for size estimation.
pub fn encrypt_with_throwaway_key(plaintext: &str) -> Result<String, CryptoError> {
    let mut key = [0u8; 32];
    OsRng.fill_bytes(&mut key);
    let token = encrypt(plaintext, &key);
    key.zeroize();
    token
}
