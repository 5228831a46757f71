//! Encrypted media sharing between partners.
//!
//! The sender looks up each recipient's published public key, encrypts the
//! photo once and stores the payload. A recipient loads the payload, reads
//! their private key from secure storage and decrypts. Decrypted bytes can be
//! staged to a cache directory for display; that copy is plaintext and the
//! caller owns its cleanup.

use crate::blocking;
use crate::config::IdentityConfig;
use crate::error::{IdentityError, IdentityResult};
use crate::store::{PayloadStore, ProfileStore, SecureKeyStore};
use bloom_crypto::{CryptoProvider, HybridEncryptionService, RustCryptoProvider};
use chrono::Utc;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Shares and opens encrypted media items.
pub struct MediaShareManager<K, D> {
    keystore: Arc<K>,
    directory: Arc<D>,
    hybrid: HybridEncryptionService,
    config: IdentityConfig,
}

impl<K, D> MediaShareManager<K, D>
where
    K: SecureKeyStore,
    D: ProfileStore + PayloadStore,
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
            hybrid: HybridEncryptionService::new(provider),
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

    /// Encrypts `plaintext` for `recipient_ids` and stores it.
    ///
    /// Recipients without a published key are skipped; at least one must
    /// have one. Returns the new item id (UUIDv7, time ordered).
    pub async fn share(&self, plaintext: Vec<u8>, recipient_ids: &[String]) -> IdentityResult<String> {
        let mut recipients = HashMap::with_capacity(recipient_ids.len());
        for user_id in recipient_ids {
            let public_key = self.directory.get_public_key(user_id).await?;
            if public_key.is_none() {
                debug!("recipient {user_id} has no published key, skipping");
            }
            recipients.insert(user_id.clone(), public_key.unwrap_or_default());
        }

        let hybrid = self.hybrid.clone();
        let payload = blocking(move || hybrid.encrypt(&plaintext, &recipients)).await?;

        let item_id = Uuid::now_v7().to_string();
        let recipient_count = payload.metadata.wrapped_keys.len();
        self.directory.put_payload(&item_id, payload).await?;

        info!("shared item {item_id} with {recipient_count} recipient(s)");
        Ok(item_id)
    }

    /// Loads and decrypts item `item_id` as `user_id` with the local key.
    pub async fn open(&self, item_id: &str, user_id: &str) -> IdentityResult<Vec<u8>> {
        let payload = self
            .directory
            .get_payload(item_id)
            .await?
            .ok_or_else(|| IdentityError::PayloadNotFound(item_id.to_string()))?;

        let private_key = self
            .keystore
            .get_item(&self.config.private_key_alias)
            .await?
            .ok_or(IdentityError::PrivateKeyMissing)?;

        let hybrid = self.hybrid.clone();
        let user = user_id.to_string();
        blocking(move || hybrid.decrypt(&payload, &user, &private_key))
            .await
            .inspect_err(|e| warn!("opening item {item_id} as {user_id} failed: {e}"))
    }

    /// Writes decrypted bytes to the staging directory for display.
    pub async fn stage_decrypted(&self, plaintext: &[u8]) -> IdentityResult<PathBuf> {
        let dir = &self.config.decrypted_media_dir;
        tokio::fs::create_dir_all(dir).await?;

        let file_name = format!(
            "dec_{}_{}.jpg",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple()
        );
        let path = dir.join(file_name);
        tokio::fs::write(&path, plaintext).await?;

        debug!("staged {} decrypted bytes at {}", plaintext.len(), path.display());
        Ok(path)
    }

    /// [`open`](Self::open) followed by [`stage_decrypted`](Self::stage_decrypted).
    pub async fn open_to_file(&self, item_id: &str, user_id: &str) -> IdentityResult<PathBuf> {
        let plaintext = self.open(item_id, user_id).await?;
        self.stage_decrypted(&plaintext).await
    }
}
