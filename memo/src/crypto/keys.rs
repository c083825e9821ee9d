//! XRPL wallet keys
//!
//! Seeds are base58 (ripple alphabet) with a type prefix and a 4-byte
//! double-SHA256 checksum. The 16 bytes of entropy they carry derive an
//! ed25519 signing key: private key = SHA-512(entropy)[..32].

use ed25519_dalek::{PublicKey as DalekPublicKey, SecretKey as DalekSecretKey};
use sha2::{Digest, Sha256, Sha512};
use zeroize::Zeroize;

use super::ecdh::{derive_shared_secret, x25519_secret, SharedSecret};
use super::CredentialProvider;
use crate::error::CryptoError;

/// Key-type byte prepended to ed25519 public keys on the ledger
pub const ED25519_KEY_PREFIX: u8 = 0xED;

/// Version bytes of an ed25519 seed (`sEd...`)
const ED25519_SEED_PREFIX: [u8; 3] = [0x01, 0xE1, 0x4B];

/// Version byte of a family seed (`s...`)
const FAMILY_SEED_PREFIX: u8 = 0x21;

const ENTROPY_LEN: usize = 16;
const CHECKSUM_LEN: usize = 4;

// ============================================================================
// Seed Codec
// ============================================================================

fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let first = Sha256::digest(payload);
    let second = Sha256::digest(first);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&second[..CHECKSUM_LEN]);
    out
}

/// Extract the 16 bytes of entropy from a wallet seed.
///
/// Accepts `sEd...` ed25519 seeds, `s...` family seeds and 32-character hex
/// entropy.
pub fn decode_seed(seed: &str) -> Result<[u8; ENTROPY_LEN], CryptoError> {
    let seed = seed.trim();
    let mut entropy = [0u8; ENTROPY_LEN];

    if seed.len() == ENTROPY_LEN * 2 && seed.chars().all(|c| c.is_ascii_hexdigit()) {
        hex::decode_to_slice(seed, &mut entropy)
            .map_err(|e| CryptoError::InvalidSeed(e.to_string()))?;
        return Ok(entropy);
    }

    let mut decoded = bs58::decode(seed)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_vec()
        .map_err(|e| CryptoError::InvalidSeed(e.to_string()))?;

    let prefix_len = if decoded.len() == ED25519_SEED_PREFIX.len() + ENTROPY_LEN + CHECKSUM_LEN
        && decoded.starts_with(&ED25519_SEED_PREFIX)
    {
        ED25519_SEED_PREFIX.len()
    } else if decoded.len() == 1 + ENTROPY_LEN + CHECKSUM_LEN && decoded[0] == FAMILY_SEED_PREFIX {
        1
    } else {
        decoded.zeroize();
        return Err(CryptoError::InvalidSeed(
            "unrecognized seed prefix or length".into(),
        ));
    };

    let body_len = decoded.len() - CHECKSUM_LEN;
    if checksum(&decoded[..body_len]) != decoded[body_len..] {
        decoded.zeroize();
        return Err(CryptoError::InvalidSeed("checksum mismatch".into()));
    }

    entropy.copy_from_slice(&decoded[prefix_len..body_len]);
    decoded.zeroize();
    Ok(entropy)
}

/// Encode entropy as an ed25519 seed (`sEd...`).
pub fn encode_seed(entropy: &[u8; ENTROPY_LEN]) -> String {
    let mut payload = Vec::with_capacity(ED25519_SEED_PREFIX.len() + ENTROPY_LEN + CHECKSUM_LEN);
    payload.extend_from_slice(&ED25519_SEED_PREFIX);
    payload.extend_from_slice(entropy);
    let check = checksum(&payload);
    payload.extend_from_slice(&check);
    let encoded = bs58::encode(&payload)
        .with_alphabet(bs58::Alphabet::RIPPLE)
        .into_string();
    payload.zeroize();
    encoded
}

// ============================================================================
// Wallet Keys
// ============================================================================

/// ed25519 keypair of a ledger wallet
///
/// Security:
/// - The private key is zeroized on drop
/// - Clone is NOT derived to prevent accidental copies
pub struct WalletKeys {
    /// SHA-512 half of the seed entropy
    private_key: [u8; 32],
    public_key: [u8; 32],
}

impl WalletKeys {
    /// Derive keys from a seed string.
    pub fn from_seed(seed: &str) -> Result<Self, CryptoError> {
        let mut entropy = decode_seed(seed)?;
        let keys = Self::from_entropy(&entropy);
        entropy.zeroize();
        keys
    }

    /// Derive keys from raw seed entropy.
    pub fn from_entropy(entropy: &[u8; ENTROPY_LEN]) -> Result<Self, CryptoError> {
        let mut digest = Sha512::digest(entropy);
        let mut private_key = [0u8; 32];
        private_key.copy_from_slice(&digest[..32]);
        digest.as_mut_slice().zeroize();

        let secret = DalekSecretKey::from_bytes(&private_key)
            .map_err(|e| CryptoError::InvalidSeed(e.to_string()))?;
        let public_key = DalekPublicKey::from(&secret).to_bytes();

        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Generate keys from fresh random entropy.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut entropy = [0u8; ENTROPY_LEN];
        rand::RngCore::fill_bytes(&mut rand::rngs::OsRng, &mut entropy);
        let keys = Self::from_entropy(&entropy);
        entropy.zeroize();
        keys
    }

    /// Raw 32-byte ed25519 public key.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.public_key
    }

    /// `ED`-prefixed uppercase hex public key, as published in handshakes.
    pub fn public_key_hex(&self) -> String {
        format!(
            "{:02X}{}",
            ED25519_KEY_PREFIX,
            hex::encode_upper(self.public_key)
        )
    }

    /// Clamped X25519 scalar bytes for this wallet.
    pub fn x25519_secret(&self) -> [u8; 32] {
        x25519_secret(&self.private_key)
    }

    /// ECDH shared secret with `their_public_key_hex`.
    pub fn shared_secret(&self, their_public_key_hex: &str) -> Result<SharedSecret, CryptoError> {
        derive_shared_secret(&self.private_key, their_public_key_hex)
    }
}

impl CredentialProvider for WalletKeys {
    fn public_key_hex(&self) -> String {
        WalletKeys::public_key_hex(self)
    }

    fn shared_secret(&self, their_public_key_hex: &str) -> Result<SharedSecret, CryptoError> {
        WalletKeys::shared_secret(self, their_public_key_hex)
    }
}

impl Drop for WalletKeys {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}

impl std::fmt::Debug for WalletKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletKeys")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod keys_tests {
    use super::*;

    #[test]
    fn test_seed_roundtrip() {
        let entropy = [7u8; 16];
        let seed = encode_seed(&entropy);
        assert!(seed.starts_with("sEd"), "ed25519 seeds start with sEd: {}", seed);
        assert_eq!(decode_seed(&seed).unwrap(), entropy);
    }

    #[test]
    fn test_family_seed_accepted() {
        let entropy = [0x42u8; 16];
        let mut payload = vec![FAMILY_SEED_PREFIX];
        payload.extend_from_slice(&entropy);
        let check = checksum(&payload);
        payload.extend_from_slice(&check);
        let seed = bs58::encode(&payload)
            .with_alphabet(bs58::Alphabet::RIPPLE)
            .into_string();
        assert!(seed.starts_with('s'));
        assert_eq!(decode_seed(&seed).unwrap(), entropy);
    }

    #[test]
    fn test_hex_entropy_accepted() {
        let entropy = decode_seed("000102030405060708090a0b0c0d0e0f").unwrap();
        assert_eq!(entropy[15], 0x0f);
    }

    #[test]
    fn test_checksum_mismatch_rejected() {
        let seed = encode_seed(&[1u8; 16]);
        let mut tampered: Vec<char> = seed.chars().collect();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == 'r' { 'p' } else { 'r' };
        let tampered: String = tampered.into_iter().collect();
        assert!(matches!(
            decode_seed(&tampered),
            Err(CryptoError::InvalidSeed(_))
        ));
    }

    #[test]
    fn test_garbage_seed_rejected() {
        assert!(decode_seed("not a seed").is_err());
        assert!(decode_seed("").is_err());
    }

    #[test]
    fn test_public_key_format() {
        let keys = WalletKeys::from_entropy(&[3u8; 16]).unwrap();
        let hex_key = keys.public_key_hex();
        assert_eq!(hex_key.len(), 66);
        assert!(hex_key.starts_with("ED"));
        assert_eq!(hex_key, hex_key.to_uppercase());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let a = WalletKeys::from_seed(&encode_seed(&[9u8; 16])).unwrap();
        let b = WalletKeys::from_entropy(&[9u8; 16]).unwrap();
        assert_eq!(a.public_key_bytes(), b.public_key_bytes());
    }
}
