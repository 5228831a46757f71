//! Multi-recipient hybrid encryption for shared media.
//!
//! Each item is encrypted once with a one-time AES-256-GCM content key. The
//! content key is then wrapped with RSA-OAEP(SHA-256) for every recipient's
//! identity public key. Recipients decrypt independently: only their own
//! entry in `wrappedKeys` is ever read.
//!
//! There is no re-wrapping or revocation. An item's recipient set is fixed
//! when it is encrypted.

use crate::error::{CryptoError, CryptoResult};
use crate::keys::{KEY_SIZE, SymmetricKey};
use crate::provider::{CryptoProvider, NONCE_SIZE, RustCryptoProvider, TAG_SIZE};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use zeroize::Zeroizing;

/// Per-item encryption parameters and the per-recipient wrapped keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptionMetadata {
    /// Base64 12-byte AES-GCM IV.
    pub iv: String,
    /// Base64 16-byte AES-GCM tag.
    pub auth_tag: String,
    /// User id -> base64 RSA-OAEP wrapped content key.
    pub wrapped_keys: HashMap<String, String>,
}

/// An encrypted shared item (e.g. a meal photo).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPayload {
    /// Base64 AES-256-GCM ciphertext.
    pub encrypted_data: String,
    pub metadata: EncryptionMetadata,
}

impl EncryptedPayload {
    /// User ids holding a wrapped copy of the content key, sorted.
    pub fn recipients(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self
            .metadata
            .wrapped_keys
            .keys()
            .map(String::as_str)
            .collect();
        ids.sort_unstable();
        ids
    }

    pub fn is_recipient(&self, user_id: &str) -> bool {
        self.metadata.wrapped_keys.contains_key(user_id)
    }
}

/// Envelope encryption of binary payloads for a set of recipients.
#[derive(Clone)]
pub struct HybridEncryptionService {
    provider: Arc<dyn CryptoProvider>,
}

impl HybridEncryptionService {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Encrypts `plaintext` for every recipient with a usable public key.
    ///
    /// `recipients` maps user id to PEM SPKI public key. Entries with an
    /// empty key are skipped; those users cannot decrypt this item. Fails if
    /// no recipient remains, since nobody could ever open the result.
    pub fn encrypt(
        &self,
        plaintext: &[u8],
        recipients: &HashMap<String, String>,
    ) -> CryptoResult<EncryptedPayload> {
        let usable: Vec<(&String, &String)> = recipients
            .iter()
            .filter(|(_, pem)| !pem.trim().is_empty())
            .collect();
        if usable.is_empty() {
            return Err(CryptoError::Encryption(
                "no recipient has a usable public key".to_string(),
            ));
        }

        let mut raw_key = Zeroizing::new([0u8; KEY_SIZE]);
        let mut iv = [0u8; NONCE_SIZE];
        self.provider.random_bytes(&mut raw_key[..])?;
        self.provider.random_bytes(&mut iv)?;
        let content_key = SymmetricKey::from_bytes(*raw_key);

        let (ciphertext, tag) = self.provider.aead_encrypt(&content_key, &iv, plaintext)?;

        let mut wrapped_keys = HashMap::with_capacity(usable.len());
        for (user_id, pem) in usable {
            let wrapped = self
                .provider
                .rsa_wrap(pem, content_key.as_bytes())
                .map_err(|e| match e {
                    CryptoError::InvalidKey(reason) => CryptoError::Encryption(format!(
                        "invalid public key for recipient {user_id}: {reason}"
                    )),
                    other => other,
                })?;
            wrapped_keys.insert(user_id.clone(), BASE64.encode(wrapped));
        }

        debug!(
            "encrypted {} bytes for {} recipient(s), skipped {}",
            plaintext.len(),
            wrapped_keys.len(),
            recipients.len() - wrapped_keys.len()
        );

        Ok(EncryptedPayload {
            encrypted_data: BASE64.encode(ciphertext),
            metadata: EncryptionMetadata {
                iv: BASE64.encode(iv),
                auth_tag: BASE64.encode(tag),
                wrapped_keys,
            },
        })
    }

    /// Decrypts a payload as `user_id` with that user's private key.
    ///
    /// Returns plaintext only after the GCM tag verifies.
    pub fn decrypt(
        &self,
        payload: &EncryptedPayload,
        user_id: &str,
        private_key_pem: &str,
    ) -> CryptoResult<Vec<u8>> {
        let wrapped_b64 = payload
            .metadata
            .wrapped_keys
            .get(user_id)
            .ok_or_else(|| CryptoError::RecipientNotFound(user_id.to_string()))?;

        let wrapped = BASE64
            .decode(wrapped_b64)
            .map_err(|e| CryptoError::encoding("wrappedKeys", e))?;
        let iv: [u8; NONCE_SIZE] = decode_b64_array("iv", &payload.metadata.iv)?;
        let tag: [u8; TAG_SIZE] = decode_b64_array("authTag", &payload.metadata.auth_tag)?;
        let ciphertext = BASE64
            .decode(&payload.encrypted_data)
            .map_err(|e| CryptoError::encoding("encryptedData", e))?;

        let raw_key = Zeroizing::new(
            self.provider
                .rsa_unwrap(private_key_pem, &wrapped)
                .map_err(|e| match e {
                    CryptoError::InvalidKey(reason) => CryptoError::Unwrap(reason),
                    other => other,
                })?,
        );
        let content_key = SymmetricKey::from_slice(&raw_key).map_err(|_| {
            CryptoError::Unwrap(format!(
                "unwrapped key is {} bytes, expected {KEY_SIZE}",
                raw_key.len()
            ))
        })?;

        self.provider.aead_decrypt(&content_key, &iv, &ciphertext, &tag)
    }
}

impl Default for HybridEncryptionService {
    fn default() -> Self {
        Self::new(Arc::new(RustCryptoProvider))
    }
}

fn decode_b64_array<const N: usize>(field: &'static str, value: &str) -> CryptoResult<[u8; N]> {
    let bytes = BASE64
        .decode(value)
        .map_err(|e| CryptoError::encoding(field, e))?;
    bytes.as_slice().try_into().map_err(|_| {
        CryptoError::encoding(field, format!("expected {N} bytes, got {}", bytes.len()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_recipient_map_is_rejected() {
        let service = HybridEncryptionService::default();
        let result = service.encrypt(b"photo", &HashMap::new());
        assert!(matches!(result, Err(CryptoError::Encryption(_))));
    }

    #[test]
    fn recipients_with_blank_keys_only_are_rejected() {
        let service = HybridEncryptionService::default();
        let recipients = HashMap::from([
            ("alice".to_string(), String::new()),
            ("bob".to_string(), "  \n".to_string()),
        ]);
        let result = service.encrypt(b"photo", &recipients);
        assert!(matches!(result, Err(CryptoError::Encryption(_))));
    }

    #[test]
    fn malformed_recipient_key_names_recipient() {
        let service = HybridEncryptionService::default();
        let recipients = HashMap::from([("carol".to_string(), "garbage".to_string())]);
        match service.encrypt(b"photo", &recipients) {
            Err(CryptoError::Encryption(msg)) => assert!(msg.contains("carol")),
            other => panic!("expected encryption error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_recipient_is_reported() {
        let payload = EncryptedPayload {
            encrypted_data: String::new(),
            metadata: EncryptionMetadata {
                iv: BASE64.encode([0u8; NONCE_SIZE]),
                auth_tag: BASE64.encode([0u8; TAG_SIZE]),
                wrapped_keys: HashMap::from([("alice".to_string(), "AAAA".to_string())]),
            },
        };
        let result = HybridEncryptionService::default().decrypt(&payload, "mallory", "pem");
        assert!(matches!(result, Err(CryptoError::RecipientNotFound(id)) if id == "mallory"));
    }

    #[test]
    fn recipients_are_sorted() {
        let payload = EncryptedPayload {
            encrypted_data: String::new(),
            metadata: EncryptionMetadata {
                iv: String::new(),
                auth_tag: String::new(),
                wrapped_keys: HashMap::from([
                    ("zoe".to_string(), String::new()),
                    ("adam".to_string(), String::new()),
                ]),
            },
        };
        assert_eq!(payload.recipients(), vec!["adam", "zoe"]);
        assert!(payload.is_recipient("zoe"));
        assert!(!payload.is_recipient("eve"));
    }
}
