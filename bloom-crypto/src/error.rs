//! Error types for the E2EE core.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors produced by key generation, recovery sealing and hybrid encryption.
///
/// None of these are transient; callers decide on messaging and retries.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    #[error("invalid recovery mnemonic")]
    InvalidMnemonic,

    #[error("recovery vault failed authentication (wrong mnemonic or tampered vault)")]
    VaultIntegrity,

    #[error("payload failed authentication (tampered ciphertext, iv or tag)")]
    TamperDetected,

    #[error("no wrapped key for recipient {0}")]
    RecipientNotFound(String),

    #[error("failed to unwrap content key: {0}")]
    Unwrap(String),

    #[error("encryption failed: {0}")]
    Encryption(String),

    #[error("malformed {field}: {reason}")]
    Encoding { field: &'static str, reason: String },

    #[error("invalid key material: {0}")]
    InvalidKey(String),
}

impl CryptoError {
    pub(crate) fn encoding(field: &'static str, reason: impl ToString) -> Self {
        Self::Encoding {
            field,
            reason: reason.to_string(),
        }
    }
}
