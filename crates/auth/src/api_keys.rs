//! Opaque API keys.
//!
//! The plaintext key is shown once at issuance; only its SHA-256 hex digest is
//! stored and looked up.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hex::ToHex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

use forgecrm_core::UserId;

use crate::{Principal, Role};

/// Prefix of every plaintext key, so leaked keys are easy to grep for.
pub const API_KEY_PREFIX: &str = "fcrm_";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeyId(Uuid);

impl ApiKeyId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ApiKeyId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::str::FromStr for ApiKeyId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl core::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Stored API key metadata. Never contains the plaintext key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: ApiKeyId,
    pub user_id: UserId,
    pub role: Role,
    pub key_hash: String,
    pub label: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKeyRecord {
    /// Not revoked and not past its expiry.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && self.expires_at.is_none_or(|exp| now < exp)
    }

    pub fn principal(&self) -> Principal {
        Principal::new(self.user_id, self.role)
    }
}

/// Result of [`issue_api_key`]: the plaintext is returned exactly once.
#[derive(Debug, Clone)]
pub struct IssuedApiKey {
    pub plaintext: String,
    pub record: ApiKeyRecord,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiKeyStoreError {
    #[error("api key hash already exists")]
    Duplicate,

    #[error("api key not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

#[async_trait]
pub trait ApiKeyStore: Send + Sync {
    async fn insert(&self, record: ApiKeyRecord) -> Result<(), ApiKeyStoreError>;

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, ApiKeyStoreError>;

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ApiKeyRecord>, ApiKeyStoreError>;

    /// Mark a key revoked. Revoking twice keeps the first timestamp.
    async fn revoke(&self, id: ApiKeyId, now: DateTime<Utc>) -> Result<ApiKeyRecord, ApiKeyStoreError>;
}

#[async_trait]
impl<S> ApiKeyStore for Arc<S>
where
    S: ApiKeyStore + ?Sized,
{
    async fn insert(&self, record: ApiKeyRecord) -> Result<(), ApiKeyStoreError> {
        (**self).insert(record).await
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, ApiKeyStoreError> {
        (**self).find_by_hash(key_hash).await
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ApiKeyRecord>, ApiKeyStoreError> {
        (**self).list_for_user(user_id).await
    }

    async fn revoke(&self, id: ApiKeyId, now: DateTime<Utc>) -> Result<ApiKeyRecord, ApiKeyStoreError> {
        (**self).revoke(id, now).await
    }
}

/// In-memory API key store for tests/dev, keyed by hash.
#[derive(Debug, Default)]
pub struct InMemoryApiKeyStore {
    keys: RwLock<HashMap<String, ApiKeyRecord>>,
}

impl InMemoryApiKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> ApiKeyStoreError {
        ApiKeyStoreError::Storage("api key store lock poisoned".to_string())
    }
}

#[async_trait]
impl ApiKeyStore for InMemoryApiKeyStore {
    async fn insert(&self, record: ApiKeyRecord) -> Result<(), ApiKeyStoreError> {
        let mut keys = self.keys.write().map_err(|_| Self::poisoned())?;
        if keys.contains_key(&record.key_hash) {
            return Err(ApiKeyStoreError::Duplicate);
        }
        keys.insert(record.key_hash.clone(), record);
        Ok(())
    }

    async fn find_by_hash(&self, key_hash: &str) -> Result<Option<ApiKeyRecord>, ApiKeyStoreError> {
        let keys = self.keys.read().map_err(|_| Self::poisoned())?;
        Ok(keys.get(key_hash).cloned())
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<ApiKeyRecord>, ApiKeyStoreError> {
        let keys = self.keys.read().map_err(|_| Self::poisoned())?;
        let mut records: Vec<_> = keys.values().filter(|r| r.user_id == user_id).cloned().collect();
        records.sort_by_key(|r| r.created_at);
        Ok(records)
    }

    async fn revoke(&self, id: ApiKeyId, now: DateTime<Utc>) -> Result<ApiKeyRecord, ApiKeyStoreError> {
        let mut keys = self.keys.write().map_err(|_| Self::poisoned())?;
        let record = keys
            .values_mut()
            .find(|r| r.id == id)
            .ok_or(ApiKeyStoreError::NotFound)?;
        record.revoked_at.get_or_insert(now);
        Ok(record.clone())
    }
}

/// SHA-256 hex digest of a plaintext key.
pub fn hash_api_key(plaintext: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext.as_bytes());
    hasher.finalize().encode_hex::<String>()
}

/// Generate a key for `user_id`, store its hash, and return the plaintext once.
pub async fn issue_api_key(
    store: &dyn ApiKeyStore,
    user_id: UserId,
    role: Role,
    label: impl Into<String>,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<IssuedApiKey, ApiKeyStoreError> {
    let plaintext = format!("{API_KEY_PREFIX}{}", Uuid::new_v4().simple());
    let record = ApiKeyRecord {
        id: ApiKeyId::new(),
        user_id,
        role,
        key_hash: hash_api_key(&plaintext),
        label: label.into(),
        created_at: now,
        expires_at,
        revoked_at: None,
    };
    store.insert(record.clone()).await?;
    tracing::info!(key_id = %record.id, user_id = %user_id, "api key issued");
    Ok(IssuedApiKey { plaintext, record })
}
