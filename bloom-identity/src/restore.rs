//! New-device recovery from the recovery phrase.

use crate::blocking;
use crate::config::IdentityConfig;
use crate::error::{IdentityError, IdentityResult};
use crate::store::{KeyAccessibility, ProfileStore, SecureKeyStore, VaultStore};
use bloom_crypto::{
    CryptoProvider, RecoveryService, RustCryptoProvider, normalize_mnemonic,
    public_key_fingerprint,
};
use std::sync::Arc;
use tracing::{info, warn};
use zeroize::Zeroizing;

/// Restores a user's identity key from their vault and recovery phrase.
pub struct RestoreManager<K, D> {
    keystore: Arc<K>,
    directory: Arc<D>,
    recovery: RecoveryService,
    provider: Arc<dyn CryptoProvider>,
    config: IdentityConfig,
}

impl<K, D> RestoreManager<K, D>
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
            recovery: RecoveryService::new(provider.clone(), &config.crypto),
            provider,
            config,
        }
    }

    pub fn with_defaults(keystore: Arc<K>, directory: Arc<D>) -> Self {
        Self::new(
            keystore,
            directory,
            Arc::new(RustCryptoProvider),
            IdentityConfig::default(),
        )
    }

    /// Returns true if this device already holds an identity private key.
    pub async fn has_local_identity(&self) -> IdentityResult<bool> {
        Ok(self
            .keystore
            .get_item(&self.config.private_key_alias)
            .await?
            .is_some())
    }

    /// Unseals `user_id`'s vault with the typed phrase and provisions the
    /// private key into secure storage. Returns the matching public key.
    ///
    /// The phrase is normalized first, so stray spaces and capitals are
    /// tolerated. If the user has a published public key, the recovered key
    /// must match it.
    pub async fn restore_identity(&self, user_id: &str, mnemonic: &str) -> IdentityResult<String> {
        if !self.keystore.is_available().await {
            return Err(IdentityError::SecureStorageUnavailable);
        }

        let record = self
            .directory
            .get_vault(user_id)
            .await?
            .ok_or_else(|| IdentityError::VaultNotFound(user_id.to_string()))?;

        let sealed = record.sealed();
        let mnemonic = Zeroizing::new(normalize_mnemonic(mnemonic));
        let recovery = self.recovery.clone();
        let provider = self.provider.clone();
        let (private_key, public_key) = blocking(move || {
            let private_key = recovery.unseal_private_key(&sealed, &mnemonic)?;
            let public_key = provider.public_key_from_private(&private_key)?;
            Ok((private_key, public_key))
        })
        .await
        .inspect_err(|e| warn!("restoring identity for {user_id} failed: {e}"))?;

        let fingerprint = public_key_fingerprint(&public_key)?;
        if let Some(published) = self.directory.get_public_key(user_id).await?
            && !published.trim().is_empty()
            && public_key_fingerprint(&published)? != fingerprint
        {
            warn!("recovered key {fingerprint} does not match published key of {user_id}");
            return Err(IdentityError::KeyMismatch(user_id.to_string()));
        }

        self.keystore
            .set_item(
                &self.config.private_key_alias,
                &private_key,
                KeyAccessibility::WhenUnlockedThisDeviceOnly,
            )
            .await?;

        info!("restored identity for user {user_id}, key {fingerprint}");
        Ok(public_key)
    }
}
