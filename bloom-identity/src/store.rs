//! Collaborator interfaces and in-memory implementations.
//!
//! The flows in this crate never talk to a platform keystore or a backend
//! directly. They go through these traits:
//!
//! - [`SecureKeyStore`]: device keystore holding the raw private key.
//! - [`ProfileStore`]: users' published public keys.
//! - [`VaultStore`]: sealed recovery vaults, one per user, write-once.
//! - [`PayloadStore`]: encrypted shared items.
//!
//! [`MemoryKeyStore`] and [`MemoryDirectory`] back them with maps for tests
//! and local development.

use crate::error::{IdentityError, IdentityResult};
use bloom_crypto::{EncryptedPayload, SealedPrivateKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::RwLock;
use zeroize::Zeroizing;

/// When a secure storage entry may be read.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAccessibility {
    WhenUnlocked,
    /// Readable only while unlocked and excluded from cross-device backups.
    WhenUnlockedThisDeviceOnly,
}

/// Server-side recovery vault row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultRecord {
    pub user_id: String,
    pub encrypted_private_key: String,
    pub salt: String,
    pub iv: String,
    pub auth_tag: String,
}

impl VaultRecord {
    pub fn new(user_id: impl Into<String>, sealed: SealedPrivateKey) -> Self {
        Self {
            user_id: user_id.into(),
            encrypted_private_key: sealed.encrypted_private_key,
            salt: sealed.salt,
            iv: sealed.iv,
            auth_tag: sealed.auth_tag,
        }
    }

    pub fn sealed(&self) -> SealedPrivateKey {
        SealedPrivateKey {
            encrypted_private_key: self.encrypted_private_key.clone(),
            salt: self.salt.clone(),
            iv: self.iv.clone(),
            auth_tag: self.auth_tag.clone(),
        }
    }
}

/// Platform keystore for on-device secrets.
pub trait SecureKeyStore: Send + Sync {
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    fn set_item(
        &self,
        alias: &str,
        value: &str,
        accessibility: KeyAccessibility,
    ) -> impl Future<Output = IdentityResult<()>> + Send;

    fn get_item(
        &self,
        alias: &str,
    ) -> impl Future<Output = IdentityResult<Option<Zeroizing<String>>>> + Send;

    fn delete_item(&self, alias: &str) -> impl Future<Output = IdentityResult<()>> + Send;
}

/// Published identity public keys, by user id.
pub trait ProfileStore: Send + Sync {
    fn get_public_key(
        &self,
        user_id: &str,
    ) -> impl Future<Output = IdentityResult<Option<String>>> + Send;

    fn set_public_key(
        &self,
        user_id: &str,
        public_key: &str,
    ) -> impl Future<Output = IdentityResult<()>> + Send;
}

/// Recovery vaults, by user id. Inserting over an existing vault fails
/// with [`IdentityError::VaultExists`].
pub trait VaultStore: Send + Sync {
    fn insert_vault(&self, record: VaultRecord) -> impl Future<Output = IdentityResult<()>> + Send;

    fn get_vault(
        &self,
        user_id: &str,
    ) -> impl Future<Output = IdentityResult<Option<VaultRecord>>> + Send;
}

/// Encrypted shared items, by item id.
pub trait PayloadStore: Send + Sync {
    fn put_payload(
        &self,
        item_id: &str,
        payload: EncryptedPayload,
    ) -> impl Future<Output = IdentityResult<()>> + Send;

    fn get_payload(
        &self,
        item_id: &str,
    ) -> impl Future<Output = IdentityResult<Option<EncryptedPayload>>> + Send;
}

// ============================================================================
// MemoryKeyStore
// ============================================================================

struct StoredSecret {
    value: Zeroizing<String>,
    accessibility: KeyAccessibility,
}

/// In-memory [`SecureKeyStore`]. One instance models one device.
#[derive(Clone)]
pub struct MemoryKeyStore {
    entries: Arc<RwLock<HashMap<String, StoredSecret>>>,
    available: bool,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            available: true,
        }
    }

    /// A device without a passcode or biometric lock.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Access policy recorded for `alias`, if present.
    pub async fn accessibility(&self, alias: &str) -> Option<KeyAccessibility> {
        self.entries
            .read()
            .await
            .get(alias)
            .map(|secret| secret.accessibility)
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MemoryKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureKeyStore for MemoryKeyStore {
    async fn is_available(&self) -> bool {
        self.available
    }

    async fn set_item(
        &self,
        alias: &str,
        value: &str,
        accessibility: KeyAccessibility,
    ) -> IdentityResult<()> {
        if !self.available {
            return Err(IdentityError::SecureStorageUnavailable);
        }
        self.entries.write().await.insert(
            alias.to_string(),
            StoredSecret {
                value: Zeroizing::new(value.to_string()),
                accessibility,
            },
        );
        Ok(())
    }

    async fn get_item(&self, alias: &str) -> IdentityResult<Option<Zeroizing<String>>> {
        if !self.available {
            return Err(IdentityError::SecureStorageUnavailable);
        }
        Ok(self
            .entries
            .read()
            .await
            .get(alias)
            .map(|secret| secret.value.clone()))
    }

    async fn delete_item(&self, alias: &str) -> IdentityResult<()> {
        self.entries.write().await.remove(alias);
        Ok(())
    }
}

// ============================================================================
// MemoryDirectory
// ============================================================================

/// In-memory backend: profiles, vaults and payloads.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    public_keys: Arc<RwLock<HashMap<String, String>>>,
    vaults: Arc<RwLock<HashMap<String, VaultRecord>>>,
    payloads: Arc<RwLock<HashMap<String, EncryptedPayload>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn payload_count(&self) -> usize {
        self.payloads.read().await.len()
    }
}

impl ProfileStore for MemoryDirectory {
    async fn get_public_key(&self, user_id: &str) -> IdentityResult<Option<String>> {
        Ok(self.public_keys.read().await.get(user_id).cloned())
    }

    async fn set_public_key(&self, user_id: &str, public_key: &str) -> IdentityResult<()> {
        self.public_keys
            .write()
            .await
            .insert(user_id.to_string(), public_key.to_string());
        Ok(())
    }
}

impl VaultStore for MemoryDirectory {
    async fn insert_vault(&self, record: VaultRecord) -> IdentityResult<()> {
        let mut vaults = self.vaults.write().await;
        if vaults.contains_key(&record.user_id) {
            return Err(IdentityError::VaultExists(record.user_id));
        }
        vaults.insert(record.user_id.clone(), record);
        Ok(())
    }

    async fn get_vault(&self, user_id: &str) -> IdentityResult<Option<VaultRecord>> {
        Ok(self.vaults.read().await.get(user_id).cloned())
    }
}

impl PayloadStore for MemoryDirectory {
    async fn put_payload(&self, item_id: &str, payload: EncryptedPayload) -> IdentityResult<()> {
        self.payloads
            .write()
            .await
            .insert(item_id.to_string(), payload);
        Ok(())
    }

    async fn get_payload(&self, item_id: &str) -> IdentityResult<Option<EncryptedPayload>> {
        Ok(self.payloads.read().await.get(item_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sealed() -> SealedPrivateKey {
        SealedPrivateKey {
            encrypted_private_key: "Y2lwaGVy".into(),
            salt: "00".repeat(16),
            iv: "11".repeat(12),
            auth_tag: "22".repeat(16),
        }
    }

    #[test]
    fn vault_record_round_trips_sealed_key() {
        let record = VaultRecord::new("user-1", sealed());
        assert_eq!(record.sealed(), sealed());

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["user_id"], "user-1");
        assert!(json.get("auth_tag").is_some());
    }

    #[tokio::test]
    async fn vault_insert_is_write_once() {
        let directory = MemoryDirectory::new();
        directory.insert_vault(VaultRecord::new("user-1", sealed())).await.unwrap();

        let result = directory.insert_vault(VaultRecord::new("user-1", sealed())).await;
        assert!(matches!(result, Err(IdentityError::VaultExists(id)) if id == "user-1"));
    }

    #[tokio::test]
    async fn unavailable_keystore_refuses_reads_and_writes() {
        let store = MemoryKeyStore::unavailable();
        assert!(!store.is_available().await);
        assert!(store.set_item("k", "v", KeyAccessibility::WhenUnlocked).await.is_err());
        assert!(store.get_item("k").await.is_err());
    }

    #[tokio::test]
    async fn keystore_records_accessibility() {
        let store = MemoryKeyStore::new();
        store
            .set_item("k", "v", KeyAccessibility::WhenUnlockedThisDeviceOnly)
            .await
            .unwrap();
        assert_eq!(
            store.accessibility("k").await,
            Some(KeyAccessibility::WhenUnlockedThisDeviceOnly)
        );
        assert_eq!(store.get_item("k").await.unwrap().unwrap().as_str(), "v");

        store.delete_item("k").await.unwrap();
        assert!(store.is_empty().await);
    }
}
