//! End-to-end encryption core for Bloom.
//!
//! Partners share meal photos that the backend must never be able to read.
//! This crate holds the key management and sealing layer behind that:
//!
//! - **Identity keys**: one RSA-2048 key pair per user. The public key is
//!   published on the profile, the private key stays in device secure storage.
//! - **Recovery vault**: the private key sealed with AES-256-GCM under a key
//!   stretched from a 12-word BIP39 mnemonic (PBKDF2-HMAC-SHA256). The vault
//!   lives server-side; the mnemonic only in the user's head.
//! - **Hybrid encryption**: each shared item gets a one-time AES-256-GCM key,
//!   wrapped with RSA-OAEP(SHA-256) once per recipient.
//!
//! All primitives go through [`CryptoProvider`]; services are plain values
//! constructed with the provider they should use.

mod config;
mod error;
pub mod hybrid;
pub mod keys;
pub mod provider;
pub mod recovery;

pub use config::{CryptoConfig, PBKDF2_ITERATIONS};
pub use error::{CryptoError, CryptoResult};
pub use hybrid::{EncryptedPayload, EncryptionMetadata, HybridEncryptionService};
pub use keys::{
    IdentityKeyPair, KEY_SIZE, KeyGenerator, MAX_WRAP_PLAINTEXT, RSA_MODULUS_BITS, SymmetricKey,
    public_key_fingerprint,
};
pub use provider::{CryptoProvider, NONCE_SIZE, RustCryptoProvider, TAG_SIZE};
pub use recovery::{
    MNEMONIC_WORDS, RecoveryService, SALT_SIZE, SealedPrivateKey, confirm_mnemonic,
    is_valid_mnemonic, normalize_mnemonic,
};
