//! Identity key pairs and symmetric key material.
//!
//! Every user owns one RSA-2048 identity key pair. The public half is
//! published on the user's profile; the private half stays on the device
//! (and, sealed, in the recovery vault). The same key pair wraps the content
//! keys of shared media, so its size is tied to the RSA-OAEP overhead the
//! wrap path assumes.

use crate::error::{CryptoError, CryptoResult};
use crate::provider::{CryptoProvider, RustCryptoProvider};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// RSA modulus length for identity keys.
pub const RSA_MODULUS_BITS: usize = 2048;

/// Size of AES-256 keys (content keys and vault master keys).
pub const KEY_SIZE: usize = 32;

/// Largest plaintext RSA-OAEP(SHA-256) can wrap under a 2048-bit modulus:
/// `modulus_bytes - 2 * hash_len - 2`.
pub const MAX_WRAP_PLAINTEXT: usize = RSA_MODULUS_BITS / 8 - 2 * 32 - 2;

/// A 256-bit symmetric key, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey([u8; KEY_SIZE]);

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Builds a key from a slice, rejecting anything that is not 32 bytes.
    pub fn from_slice(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; KEY_SIZE] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!(
                "expected {KEY_SIZE}-byte key, got {} bytes",
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey([REDACTED])")
    }
}

/// RSA identity key pair, both halves PEM-encoded.
///
/// `public_key` is SPKI (`BEGIN PUBLIC KEY`), `private_key` is PKCS8
/// (`BEGIN PRIVATE KEY`).
#[derive(Clone)]
pub struct IdentityKeyPair {
    pub public_key: String,
    pub private_key: Zeroizing<String>,
}

impl IdentityKeyPair {
    pub fn new(public_key: String, private_key: Zeroizing<String>) -> Self {
        Self {
            public_key,
            private_key,
        }
    }

    /// SHA-256 fingerprint of the public key, see [`public_key_fingerprint`].
    pub fn fingerprint(&self) -> CryptoResult<String> {
        public_key_fingerprint(&self.public_key)
    }
}

impl fmt::Debug for IdentityKeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityKeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// Lowercase hex SHA-256 over the DER encoding of an SPKI public key.
///
/// Lets two partners compare keys out of band regardless of PEM line
/// wrapping.
pub fn public_key_fingerprint(public_key_pem: &str) -> CryptoResult<String> {
    let key = rsa::RsaPublicKey::from_public_key_pem(public_key_pem.trim())
        .map_err(|e| CryptoError::InvalidKey(format!("public key PEM: {e}")))?;
    let der = key
        .to_public_key_der()
        .map_err(|e| CryptoError::InvalidKey(format!("public key DER: {e}")))?;
    Ok(hex::encode(Sha256::digest(der.as_bytes())))
}

/// Produces identity key pairs through a [`CryptoProvider`].
#[derive(Clone)]
pub struct KeyGenerator {
    provider: Arc<dyn CryptoProvider>,
}

impl KeyGenerator {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Generates a fresh RSA-2048 identity key pair.
    ///
    /// Blocking and CPU heavy. Nothing is persisted; the caller stores the
    /// halves where they belong.
    pub fn generate_identity_keys(&self) -> CryptoResult<IdentityKeyPair> {
        let pair = self.provider.generate_key_pair(RSA_MODULUS_BITS)?;
        debug!("generated {RSA_MODULUS_BITS}-bit identity key pair");
        Ok(pair)
    }
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(Arc::new(RustCryptoProvider))
    }
}
