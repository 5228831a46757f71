//! Tunable cost parameters for the E2EE core.

use serde::{Deserialize, Serialize};

/// PBKDF2-HMAC-SHA256 rounds used to stretch a recovery mnemonic.
///
/// Vaults do not record their round count, so raising this requires a
/// migration of existing vaults.
pub const PBKDF2_ITERATIONS: u32 = 100_000;

/// Configuration for the crypto services.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2 rounds for sealing and unsealing recovery vaults.
    pub pbkdf2_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: PBKDF2_ITERATIONS,
        }
    }
}
