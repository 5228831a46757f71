//! Identity flow error types.

use bloom_crypto::CryptoError;
use thiserror::Error;

/// Result type for identity flows.
pub type IdentityResult<T> = Result<T, IdentityError>;

/// Errors from onboarding, restore and sharing flows.
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("secure storage is unavailable (device passcode or biometric lock required)")]
    SecureStorageUnavailable,

    #[error("no private key in secure storage")]
    PrivateKeyMissing,

    #[error("an identity key already exists on this device")]
    IdentityExists,

    #[error("no recovery vault for user {0}")]
    VaultNotFound(String),

    #[error("recovery vault already exists for user {0}")]
    VaultExists(String),

    #[error("payload not found: {0}")]
    PayloadNotFound(String),

    #[error("recovered key does not match the published public key of user {0}")]
    KeyMismatch(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("background task failed: {0}")]
    Task(String),
}
