//! Ed25519 signing for provenance envelopes.
//!
//! Keys arrive as a hex-encoded 32-byte seed, either inline or in a file.
//! Key material is held in zeroizing buffers for its whole lifetime.

use crate::error::{Error, Result};
use openssl::pkey::{Id, PKey, Private, Public};
use openssl::sign::{Signer, Verifier};
use std::fs::read_to_string;
use std::path::Path;
use zeroize::{ZeroizeOnDrop, Zeroizing};

pub mod signable;

/// Length in bytes of an Ed25519 private key seed.
pub const ED25519_SEED_SIZE: usize = 32;

/// Secure wrapper for private key data that zeroizes on drop
#[derive(ZeroizeOnDrop)]
pub struct SecurePrivateKey {
    #[zeroize(skip)]
    pkey: PKey<Private>,
    _seed: Zeroizing<Vec<u8>>,
}

impl SecurePrivateKey {
    /// Create a key from a raw Ed25519 seed
    pub fn from_seed(seed: &[u8]) -> Result<Self> {
        if seed.len() != ED25519_SEED_SIZE {
            return Err(Error::Validation(format!(
                "decoded key has wrong size, expected {ED25519_SEED_SIZE} bytes, got {}",
                seed.len()
            )));
        }

        let seed = Zeroizing::new(seed.to_vec());
        let pkey = PKey::private_key_from_raw_bytes(&seed, Id::ED25519)
            .map_err(|e| Error::Signing(format!("Failed to load private key: {e}")))?;

        Ok(Self { pkey, _seed: seed })
    }

    /// Create a key from a hex-encoded seed. Surrounding whitespace is ignored.
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let seed = Zeroizing::new(
            hex::decode(key_hex.trim())
                .map_err(|e| Error::Validation(format!("unable to decode key: {e}")))?,
        );
        Self::from_seed(&seed)
    }

    /// Get a reference to the inner PKey
    pub fn as_pkey(&self) -> &PKey<Private> {
        &self.pkey
    }

    /// Derive the public half of this key
    pub fn public_key(&self) -> Result<PKey<Public>> {
        let raw = self
            .pkey
            .raw_public_key()
            .map_err(|e| Error::Signing(format!("Failed to derive public key: {e}")))?;

        PKey::public_key_from_raw_bytes(&raw, Id::ED25519)
            .map_err(|e| Error::Signing(format!("Failed to load public key: {e}")))
    }
}

/// Resolve the signing key from exactly one of an inline hex seed or a key file.
///
/// Empty values count as not given.
pub fn load_private_key(key: Option<&str>, key_path: Option<&Path>) -> Result<SecurePrivateKey> {
    let key = key.filter(|k| !k.is_empty());
    let key_path = key_path.filter(|p| !p.as_os_str().is_empty());

    match (key, key_path) {
        (Some(_), Some(_)) => Err(Error::Validation(
            "both key and key-path specified".to_string(),
        )),
        (None, None) => Err(Error::Validation(
            "neither key nor key-path specified".to_string(),
        )),
        (Some(key_hex), None) => SecurePrivateKey::from_hex(key_hex),
        (None, Some(path)) => {
            let content = Zeroizing::new(
                read_to_string(path)
                    .map_err(|e| Error::file_io("error reading key file", path, e))?,
            );
            SecurePrivateKey::from_hex(&content)
        }
    }
}

/// Sign data with the Ed25519 key
pub fn sign_data(data: &[u8], private_key: &SecurePrivateKey) -> Result<Vec<u8>> {
    let mut signer = Signer::new_without_digest(private_key.as_pkey())
        .map_err(|e| Error::Signing(format!("Failed to create signer: {e}")))?;

    signer
        .sign_oneshot_to_vec(data)
        .map_err(|e| Error::Signing(format!("Failed to sign data: {e}")))
}

/// Verify an Ed25519 signature over data
pub fn verify_signature(data: &[u8], signature: &[u8], public_key: &PKey<Public>) -> Result<bool> {
    let mut verifier =
        Verifier::new_without_digest(public_key).map_err(|e| Error::Signing(e.to_string()))?;

    verifier
        .verify_oneshot(signature, data)
        .map_err(|e| Error::Signing(e.to_string()))
}
