//! Cryptographic primitive provider.
//!
//! The services in this crate never call a crypto library directly. They go
//! through [`CryptoProvider`], which exposes exactly the primitives the E2EE
//! layer needs:
//!
//! - RSA key pair generation (PEM SPKI / PKCS8)
//! - secure random bytes
//! - AES-256-GCM with a detached 16-byte tag and no associated data
//! - PBKDF2-HMAC-SHA256 to a 32-byte key
//! - RSA-OAEP (SHA-256 digest and MGF1) key wrapping
//!
//! [`RustCryptoProvider`] implements it on the RustCrypto crates. Tests swap
//! in their own implementation to simulate provider failures.

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{IdentityKeyPair, KEY_SIZE, SymmetricKey};
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce, Tag};
use rand::RngCore;
use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;

/// AES-GCM nonce size in bytes.
pub const NONCE_SIZE: usize = 12;

/// AES-GCM authentication tag size in bytes.
pub const TAG_SIZE: usize = 16;

/// Narrow interface over the primitives used by the E2EE services.
pub trait CryptoProvider: Send + Sync {
    /// Generates an RSA key pair with the given modulus length.
    fn generate_key_pair(&self, modulus_bits: usize) -> CryptoResult<IdentityKeyPair>;

    /// Fills `buf` from a cryptographically secure RNG.
    fn random_bytes(&self, buf: &mut [u8]) -> CryptoResult<()>;

    /// AES-256-GCM encryption. Returns the ciphertext and the detached tag.
    fn aead_encrypt(
        &self,
        key: &SymmetricKey,
        iv: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> CryptoResult<(Vec<u8>, [u8; TAG_SIZE])>;

    /// AES-256-GCM decryption. Fails with [`CryptoError::TamperDetected`]
    /// when the tag does not verify; never returns unauthenticated bytes.
    fn aead_decrypt(
        &self,
        key: &SymmetricKey,
        iv: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
        tag: &[u8; TAG_SIZE],
    ) -> CryptoResult<Vec<u8>>;

    /// PBKDF2-HMAC-SHA256 to a 32-byte key.
    fn pbkdf2(&self, secret: &[u8], salt: &[u8], iterations: u32) -> CryptoResult<SymmetricKey>;

    /// RSA-OAEP(SHA-256) encryption of `key` under a PEM SPKI public key.
    fn rsa_wrap(&self, public_key_pem: &str, key: &[u8]) -> CryptoResult<Vec<u8>>;

    /// RSA-OAEP(SHA-256) decryption under a PEM PKCS8 private key.
    fn rsa_unwrap(&self, private_key_pem: &str, wrapped: &[u8]) -> CryptoResult<Vec<u8>>;

    /// Derives the PEM SPKI public key matching a PEM PKCS8 private key.
    fn public_key_from_private(&self, private_key_pem: &str) -> CryptoResult<String>;
}

/// [`CryptoProvider`] backed by `rsa`, `aes-gcm`, `pbkdf2` and the OS RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RustCryptoProvider;

impl RustCryptoProvider {
    fn cipher(key: &SymmetricKey) -> CryptoResult<Aes256Gcm> {
        Aes256Gcm::new_from_slice(key.as_bytes())
            .map_err(|e| CryptoError::Encryption(format!("AES-GCM setup failed: {e}")))
    }

    fn parse_public(pem: &str) -> CryptoResult<RsaPublicKey> {
        RsaPublicKey::from_public_key_pem(pem.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("public key PEM: {e}")))
    }

    fn parse_private(pem: &str) -> CryptoResult<RsaPrivateKey> {
        RsaPrivateKey::from_pkcs8_pem(pem.trim())
            .map_err(|e| CryptoError::InvalidKey(format!("private key PEM: {e}")))
    }
}

impl CryptoProvider for RustCryptoProvider {
    fn generate_key_pair(&self, modulus_bits: usize) -> CryptoResult<IdentityKeyPair> {
        let private = RsaPrivateKey::new(&mut OsRng, modulus_bits)
            .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
        let public = RsaPublicKey::from(&private);

        let private_pem = private
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(format!("PKCS8 export failed: {e}")))?;
        let public_pem = public
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::KeyGeneration(format!("SPKI export failed: {e}")))?;

        Ok(IdentityKeyPair::new(public_pem, private_pem))
    }

    fn random_bytes(&self, buf: &mut [u8]) -> CryptoResult<()> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| CryptoError::Encryption(format!("system RNG unavailable: {e}")))
    }

    fn aead_encrypt(
        &self,
        key: &SymmetricKey,
        iv: &[u8; NONCE_SIZE],
        plaintext: &[u8],
    ) -> CryptoResult<(Vec<u8>, [u8; TAG_SIZE])> {
        let cipher = Self::cipher(key)?;
        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(iv), b"", &mut buffer)
            .map_err(|e| CryptoError::Encryption(format!("AES-GCM encryption failed: {e}")))?;

        let mut tag_bytes = [0u8; TAG_SIZE];
        tag_bytes.copy_from_slice(&tag);
        Ok((buffer, tag_bytes))
    }

    fn aead_decrypt(
        &self,
        key: &SymmetricKey,
        iv: &[u8; NONCE_SIZE],
        ciphertext: &[u8],
        tag: &[u8; TAG_SIZE],
    ) -> CryptoResult<Vec<u8>> {
        let cipher = Self::cipher(key)?;
        let mut buffer = ciphertext.to_vec();
        cipher
            .decrypt_in_place_detached(Nonce::from_slice(iv), b"", &mut buffer, Tag::from_slice(tag))
            .map_err(|_| CryptoError::TamperDetected)?;
        Ok(buffer)
    }

    fn pbkdf2(&self, secret: &[u8], salt: &[u8], iterations: u32) -> CryptoResult<SymmetricKey> {
        let mut out = [0u8; KEY_SIZE];
        pbkdf2::pbkdf2_hmac::<Sha256>(secret, salt, iterations, &mut out);
        let key = SymmetricKey::from_bytes(out);
        zeroize::Zeroize::zeroize(&mut out);
        Ok(key)
    }

    fn rsa_wrap(&self, public_key_pem: &str, key: &[u8]) -> CryptoResult<Vec<u8>> {
        let public = Self::parse_public(public_key_pem)?;
        public
            .encrypt(&mut OsRng, Oaep::new::<Sha256>(), key)
            .map_err(|e| CryptoError::Encryption(format!("RSA-OAEP wrap failed: {e}")))
    }

    fn rsa_unwrap(&self, private_key_pem: &str, wrapped: &[u8]) -> CryptoResult<Vec<u8>> {
        let private = Self::parse_private(private_key_pem)?;
        private
            .decrypt(Oaep::new::<Sha256>(), wrapped)
            .map_err(|e| CryptoError::Unwrap(e.to_string()))
    }

    fn public_key_from_private(&self, private_key_pem: &str) -> CryptoResult<String> {
        let private = Self::parse_private(private_key_pem)?;
        RsaPublicKey::from(&private)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidKey(format!("SPKI export failed: {e}")))
    }
}
