//! Recovery codes and the sealed private-key vault.
//!
//! A 12-word BIP39 mnemonic is shown to the user once at onboarding. The
//! private key is sealed under a key stretched from that mnemonic with
//! PBKDF2-HMAC-SHA256 and stored server-side as a [`SealedPrivateKey`].
//! Anyone holding both the mnemonic and the vault can recover the key, so
//! the mnemonic is never stored or logged.

use crate::config::CryptoConfig;
use crate::error::{CryptoError, CryptoResult};
use crate::provider::{CryptoProvider, NONCE_SIZE, RustCryptoProvider, TAG_SIZE};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Size of the PBKDF2 salt stored in the vault.
pub const SALT_SIZE: usize = 16;

/// Words in a recovery mnemonic (128 bits of entropy).
pub const MNEMONIC_WORDS: usize = 12;

const MNEMONIC_ENTROPY_BYTES: usize = 16;

/// Private key sealed under a mnemonic-derived key.
///
/// Field encodings are part of the stored format: base64 ciphertext, hex
/// salt, IV and tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SealedPrivateKey {
    pub encrypted_private_key: String,
    pub salt: String,
    pub iv: String,
    pub auth_tag: String,
}

/// Generates, validates and applies recovery mnemonics.
#[derive(Clone)]
pub struct RecoveryService {
    provider: Arc<dyn CryptoProvider>,
    iterations: u32,
}

impl RecoveryService {
    pub fn new(provider: Arc<dyn CryptoProvider>, config: &CryptoConfig) -> Self {
        Self {
            provider,
            iterations: config.pbkdf2_iterations,
        }
    }

    /// Generates a fresh 12-word BIP39 mnemonic from 128 bits of entropy.
    pub fn generate_recovery_code(&self) -> CryptoResult<Zeroizing<String>> {
        let mut entropy = Zeroizing::new([0u8; MNEMONIC_ENTROPY_BYTES]);
        self.provider.random_bytes(&mut entropy[..])?;

        let mnemonic = bip39::Mnemonic::from_entropy(&entropy[..])
            .map_err(|e| CryptoError::KeyGeneration(format!("mnemonic generation failed: {e}")))?;

        Ok(Zeroizing::new(mnemonic.to_string()))
    }

    /// Returns true iff `mnemonic` is a valid 12-word English BIP39 phrase.
    pub fn validate_recovery_code(&self, mnemonic: &str) -> bool {
        is_valid_mnemonic(mnemonic)
    }

    /// Seals `private_key` under a key derived from `mnemonic`.
    ///
    /// Salt and IV are fresh per call, so sealing the same key twice yields
    /// unrelated vaults.
    pub fn seal_private_key(
        &self,
        private_key: &str,
        mnemonic: &str,
    ) -> CryptoResult<SealedPrivateKey> {
        if !is_valid_mnemonic(mnemonic) {
            return Err(CryptoError::InvalidMnemonic);
        }

        let mut salt = [0u8; SALT_SIZE];
        let mut iv = [0u8; NONCE_SIZE];
        self.provider.random_bytes(&mut salt)?;
        self.provider.random_bytes(&mut iv)?;

        let master_key = self
            .provider
            .pbkdf2(mnemonic.as_bytes(), &salt, self.iterations)?;
        let (ciphertext, tag) =
            self.provider
                .aead_encrypt(&master_key, &iv, private_key.as_bytes())?;

        debug!("sealed private key into recovery vault");

        Ok(SealedPrivateKey {
            encrypted_private_key: BASE64.encode(ciphertext),
            salt: hex::encode(salt),
            iv: hex::encode(iv),
            auth_tag: hex::encode(tag),
        })
    }

    /// Recovers the private key from a vault with the user's mnemonic.
    ///
    /// A wrong mnemonic and a tampered vault are indistinguishable and both
    /// surface as [`CryptoError::VaultIntegrity`].
    pub fn unseal_private_key(
        &self,
        vault: &SealedPrivateKey,
        mnemonic: &str,
    ) -> CryptoResult<Zeroizing<String>> {
        if !is_valid_mnemonic(mnemonic) {
            return Err(CryptoError::InvalidMnemonic);
        }

        let salt: [u8; SALT_SIZE] = decode_hex_array("salt", &vault.salt)?;
        let iv: [u8; NONCE_SIZE] = decode_hex_array("iv", &vault.iv)?;
        let tag: [u8; TAG_SIZE] = decode_hex_array("authTag", &vault.auth_tag)?;
        let ciphertext = BASE64
            .decode(&vault.encrypted_private_key)
            .map_err(|e| CryptoError::encoding("encryptedPrivateKey", e))?;

        let master_key = self
            .provider
            .pbkdf2(mnemonic.as_bytes(), &salt, self.iterations)?;
        let plaintext = self
            .provider
            .aead_decrypt(&master_key, &iv, &ciphertext, &tag)
            .map_err(|e| match e {
                CryptoError::TamperDetected => {
                    warn!("recovery vault failed authentication");
                    CryptoError::VaultIntegrity
                }
                other => other,
            })?;

        let private_key = String::from_utf8(plaintext).map_err(|e| {
            drop(Zeroizing::new(e.into_bytes()));
            CryptoError::VaultIntegrity
        })?;
        Ok(Zeroizing::new(private_key))
    }
}

impl Default for RecoveryService {
    fn default() -> Self {
        Self::new(Arc::new(RustCryptoProvider), &CryptoConfig::default())
    }
}

/// Checks word count, separators, wordlist membership and checksum.
///
/// Words must be separated by single spaces with no surrounding whitespace;
/// the phrase is fed to PBKDF2 verbatim, so only the canonical form is
/// accepted. Use [`normalize_mnemonic`] on user input first.
pub fn is_valid_mnemonic(mnemonic: &str) -> bool {
    if mnemonic.split(' ').count() != MNEMONIC_WORDS {
        return false;
    }
    if mnemonic.split(' ').any(|word| word.is_empty()) {
        return false;
    }
    bip39::Mnemonic::parse_normalized(mnemonic).is_ok()
}

/// Trims, lowercases and collapses whitespace to single spaces.
pub fn normalize_mnemonic(input: &str) -> String {
    input
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Compares a user's re-typed phrase against the one shown at onboarding.
pub fn confirm_mnemonic(original: &str, attempt: &str) -> bool {
    let original = Zeroizing::new(normalize_mnemonic(original));
    let attempt = Zeroizing::new(normalize_mnemonic(attempt));
    !original.is_empty() && *original == *attempt
}

fn decode_hex_array<const N: usize>(field: &'static str, value: &str) -> CryptoResult<[u8; N]> {
    let bytes = hex::decode(value).map_err(|e| CryptoError::encoding(field, e))?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::encoding(field, format!("expected {N} bytes, got {}", bytes.len()))
    })
}
