//! ed25519 → X25519 key agreement
//!
//! Handshake keys are ledger ed25519 public keys. Both sides convert to
//! Montgomery form and run X25519:
//! - secret scalar: clamped SHA-512(private key)[..32]
//! - public point: Edwards y → Montgomery u
//!
//! derive(A, B_pub) == derive(B, A_pub) since both equal a·b·G.

use curve25519_dalek::{
    edwards::CompressedEdwardsY, montgomery::MontgomeryPoint, scalar::Scalar,
};
use sha2::{Digest, Sha512};
use zeroize::Zeroize;

use super::keys::ED25519_KEY_PREFIX;
use crate::error::CryptoError;

/// 32-byte ECDH shared secret, zeroized on drop
#[derive(Clone, PartialEq, Eq)]
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

/// Strip the `ED` key-type byte from a 33-byte ledger public key.
pub fn strip_key_prefix(key: &[u8]) -> &[u8] {
    if key.len() == 33 && key[0] == ED25519_KEY_PREFIX {
        &key[1..]
    } else {
        key
    }
}

/// Clamped X25519 scalar for an ed25519 private key.
pub fn x25519_secret(ed25519_private: &[u8; 32]) -> [u8; 32] {
    let mut digest = Sha512::digest(ed25519_private);
    let mut scalar = [0u8; 32];
    scalar.copy_from_slice(&digest[..32]);
    digest.as_mut_slice().zeroize();

    scalar[0] &= 248;
    scalar[31] &= 127;
    scalar[31] |= 64;
    scalar
}

/// Convert an ed25519 public key (optionally `ED`-prefixed) to X25519.
pub fn edwards_to_montgomery(public_key: &[u8]) -> Result<MontgomeryPoint, CryptoError> {
    let raw = strip_key_prefix(public_key);
    if raw.len() != 32 {
        return Err(CryptoError::InvalidPublicKey(format!(
            "expected 32 bytes, got {}",
            raw.len()
        )));
    }
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(raw);
    let point = CompressedEdwardsY(bytes)
        .decompress()
        .ok_or_else(|| CryptoError::InvalidPublicKey("not a curve point".into()))?;
    Ok(point.to_montgomery())
}

/// X25519 between our ed25519 private key and their hex public key.
pub fn derive_shared_secret(
    our_private: &[u8; 32],
    their_public_key_hex: &str,
) -> Result<SharedSecret, CryptoError> {
    let their_bytes = hex::decode(their_public_key_hex.trim())
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let their_point = edwards_to_montgomery(&their_bytes)?;

    let mut scalar_bytes = x25519_secret(our_private);
    let scalar = Scalar::from_bits(scalar_bytes);
    scalar_bytes.zeroize();

    let shared = their_point * scalar;
    let bytes = shared.to_bytes();
    if bytes.iter().all(|b| *b == 0) {
        return Err(CryptoError::InvalidPublicKey("low order point".into()));
    }
    Ok(SharedSecret(bytes))
}
