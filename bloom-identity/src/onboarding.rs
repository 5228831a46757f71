//! First-run E2EE setup.
//!
//! 1. Require secure storage (no passcode means no safe place for the key).
//!    Refuse if this device already holds an identity key.
//! 2. Generate the identity key pair and recovery phrase, seal the vault.
//! 3. Store the private key on this device only.
//! 4. Insert the sealed vault. On failure the local key is removed again so
//!    a retry starts clean.
//! 5. Publish the public key so partners can encrypt for this user.
//!
//! Once the vault is stored the phrase is the only way to open it, so the
//! outcome is returned even when step 5 fails. `public_key_published` is
//! then false and [`OnboardingManager::republish_public_key`] finishes the
//! job later.

use crate::blocking;
use crate::config::IdentityConfig;
use crate::error::{IdentityError, IdentityResult};
use crate::store::{KeyAccessibility, ProfileStore, SecureKeyStore, VaultRecord, VaultStore};
use bloom_crypto::{
    CryptoProvider, KeyGenerator, RecoveryService, RustCryptoProvider, confirm_mnemonic,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

/// What the user needs to see after onboarding.
pub struct OnboardingOutcome {
    /// Recovery phrase. Show once, never persist.
    pub mnemonic: Zeroizing<String>,
    pub public_key: String,
    pub fingerprint: String,
    /// False if the vault was stored but publishing the public key failed.
    pub public_key_published: bool,
}

impl fmt::Debug for OnboardingOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnboardingOutcome")
            .field("mnemonic", &"[REDACTED]")
            .field("fingerprint", &self.fingerprint)
            .field("public_key_published", &self.public_key_published)
            .finish()
    }
}

/// Runs the onboarding flow against a device keystore and a backend.
pub struct OnboardingManager<K, D> {
    keystore: Arc<K>,
    directory: Arc<D>,
    keys: KeyGenerator,
    recovery: RecoveryService,
    provider: Arc<dyn CryptoProvider>,
    config: IdentityConfig,
}

impl<K, D> OnboardingManager<K, D>
where
    K: SecureKeyStore,
    D: ProfileStore + VaultStore,
{
    pub fn new(
        keystore: Arc<K>,
        directory: Arc<D>,
        provider: Arc<dyn CryptoProvider>,
        config: IdentityConfig,
    ) -> Self {
        Self {
            keystore,
            directory,
            keys: KeyGenerator::new(provider.clone()),
            recovery: RecoveryService::new(provider.clone(), &config.crypto),
            provider,
            config,
        }
    }

    /// Uses [`RustCryptoProvider`] and default configuration.
    pub fn with_defaults(keystore: Arc<K>, directory: Arc<D>) -> Self {
        Self::new(
            keystore,
            directory,
            Arc::new(RustCryptoProvider),
            IdentityConfig::default(),
        )
    }

    /// Sets up end-to-end encryption for `user_id`.
    ///
    /// Fails with [`IdentityError::IdentityExists`] if this device already
    /// holds a private key; the existing key is left untouched.
    pub async fn setup_encryption(&self, user_id: &str) -> IdentityResult<OnboardingOutcome> {
        if !self.keystore.is_available().await {
            warn!("secure storage unavailable, cannot set up encryption");
            return Err(IdentityError::SecureStorageUnavailable);
        }

        let alias = &self.config.private_key_alias;
        if self.keystore.get_item(alias).await?.is_some() {
            warn!("device already holds an identity key, refusing to onboard {user_id}");
            return Err(IdentityError::IdentityExists);
        }

        let keys = self.keys.clone();
        let recovery = self.recovery.clone();
        let (pair, mnemonic, sealed) = blocking(move || {
            let pair = keys.generate_identity_keys()?;
            let mnemonic = recovery.generate_recovery_code()?;
            let sealed = recovery.seal_private_key(&pair.private_key, &mnemonic)?;
            Ok((pair, mnemonic, sealed))
        })
        .await?;
        let fingerprint = pair.fingerprint()?;

        self.keystore
            .set_item(
                alias,
                &pair.private_key,
                KeyAccessibility::WhenUnlockedThisDeviceOnly,
            )
            .await?;

        if let Err(e) = self
            .directory
            .insert_vault(VaultRecord::new(user_id, sealed))
            .await
        {
            warn!("storing recovery vault for {user_id} failed: {e}");
            if let Err(cleanup) = self.keystore.delete_item(alias).await {
                warn!("removing local private key after failed onboarding failed: {cleanup}");
            }
            return Err(e);
        }

        let public_key_published = match self
            .directory
            .set_public_key(user_id, &pair.public_key)
            .await
        {
            Ok(()) => true,
            Err(e) => {
                warn!("publishing public key for {user_id} failed, republish required: {e}");
                false
            }
        };

        info!("end-to-end encryption set up for user {user_id}, key {fingerprint}");

        Ok(OnboardingOutcome {
            mnemonic,
            public_key: pair.public_key,
            fingerprint,
            public_key_published,
        })
    }

    /// Re-publishes the public key matching the private key on this device.
    ///
    /// Completes an onboarding whose last step failed.
    pub async fn republish_public_key(&self, user_id: &str) -> IdentityResult<String> {
        let private_key = self
            .keystore
            .get_item(&self.config.private_key_alias)
            .await?
            .ok_or(IdentityError::PrivateKeyMissing)?;

        let provider = self.provider.clone();
        let public_key = blocking(move || provider.public_key_from_private(&private_key)).await?;

        self.directory.set_public_key(user_id, &public_key).await?;
        debug!("republished public key for user {user_id}");
        Ok(public_key)
    }

    /// Checks the phrase the user re-typed against the one shown.
    pub fn verify_mnemonic(&self, original: &str, attempt: &str) -> bool {
        confirm_mnemonic(original, attempt)
    }
}
