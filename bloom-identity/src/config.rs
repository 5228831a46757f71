//! Identity flow configuration.

use bloom_crypto::CryptoConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Secure storage alias holding the raw identity private key.
pub const DEFAULT_PRIVATE_KEY_ALIAS: &str = "__user_private_key";

/// Configuration for onboarding, restore and sharing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Secure storage key under which the private key PEM is kept.
    pub private_key_alias: String,

    /// Directory decrypted media is staged in for display.
    pub decrypted_media_dir: PathBuf,

    /// Cost parameters for the crypto core.
    pub crypto: CryptoConfig,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            private_key_alias: DEFAULT_PRIVATE_KEY_ALIAS.to_string(),
            decrypted_media_dir: std::env::temp_dir().join("decrypted_images"),
            crypto: CryptoConfig::default(),
        }
    }
}
