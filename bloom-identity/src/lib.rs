//! Identity and media-sharing flows for Bloom.
//!
//! Wires the `bloom-crypto` services to the app's collaborators:
//! - onboarding: generate identity keys and a recovery phrase, keep the
//!   private key on the device, publish the public key and sealed vault
//! - restore: recover the private key on a new device from the phrase
//! - sharing: encrypt photos for a partner set and open received ones
//!
//! RSA key generation and PBKDF2 are CPU bound and run on tokio's blocking
//! pool so callers on an async runtime are never stalled.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod restore;
pub mod sharing;
pub mod store;

pub use config::{DEFAULT_PRIVATE_KEY_ALIAS, IdentityConfig};
pub use error::{IdentityError, IdentityResult};
pub use onboarding::{OnboardingManager, OnboardingOutcome};
pub use restore::RestoreManager;
pub use sharing::MediaShareManager;
pub use store::{
    KeyAccessibility, MemoryDirectory, MemoryKeyStore, PayloadStore, ProfileStore,
    SecureKeyStore, VaultRecord, VaultStore,
};

use bloom_crypto::CryptoResult;

/// Installs a stderr `tracing` subscriber filtered by `RUST_LOG`
/// (default `info`). Safe to call more than once.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

/// Runs a crypto closure on the blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> IdentityResult<T>
where
    F: FnOnce() -> CryptoResult<T> + Send + 'static,
    T: Send + 'static,
{
    let result = tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| IdentityError::Task(e.to_string()))?;
    Ok(result?)
}
