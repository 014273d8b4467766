//! Service wiring: configuration store, policy engine, credentials, and the
//! in-memory record stores backing the reference routes.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use forgecrm_auth::{ApiKeyStore, InMemoryApiKeyStore};
use forgecrm_config::{system_defaults, ConfigError, ConfigStore};
use forgecrm_core::{CustomerId, LeadId, TaskId, TicketId, UserId};
use forgecrm_entities::{Customer, Lead, Task, Ticket, User};
use forgecrm_policy::{AuthzError, PolicyEngine};

/// Keyed in-memory record store for dev/tests.
///
/// Entity persistence is owned elsewhere; these stores only give the routes
/// something to load snapshots from.
#[derive(Debug)]
pub struct RecordStore<K, V> {
    inner: RwLock<BTreeMap<K, V>>,
}

impl<K, V> Default for RecordStore<K, V> {
    fn default() -> Self {
        Self {
            inner: RwLock::new(BTreeMap::new()),
        }
    }
}

impl<K, V> RecordStore<K, V>
where
    K: Ord + Copy,
    V: Clone,
{
    pub fn get(&self, key: &K) -> Result<Option<V>, AuthzError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.get(key).cloned())
    }

    pub fn list(&self) -> Result<Vec<V>, AuthzError> {
        let map = self.inner.read().map_err(|_| Self::poisoned())?;
        Ok(map.values().cloned().collect())
    }

    pub fn upsert(&self, key: K, value: V) -> Result<(), AuthzError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        map.insert(key, value);
        Ok(())
    }

    pub fn remove(&self, key: &K) -> Result<Option<V>, AuthzError> {
        let mut map = self.inner.write().map_err(|_| Self::poisoned())?;
        Ok(map.remove(key))
    }

    fn poisoned() -> AuthzError {
        AuthzError::internal("record store lock poisoned")
    }
}

/// Everything the routes need, shared behind an `Arc`.
pub struct AppServices {
    pub config: ConfigStore,
    pub policy: PolicyEngine,
    pub api_keys: Arc<dyn ApiKeyStore>,
    pub users: RecordStore<UserId, User>,
    pub tasks: RecordStore<TaskId, Task>,
    pub tickets: RecordStore<TicketId, Ticket>,
    pub leads: RecordStore<LeadId, Lead>,
    pub customers: RecordStore<CustomerId, Customer>,
}

impl AppServices {
    /// Wire services over `config` without seeding it.
    pub fn new(config: ConfigStore, api_keys: Arc<dyn ApiKeyStore>) -> Self {
        Self {
            policy: PolicyEngine::new(config.clone()),
            config,
            api_keys,
            users: RecordStore::default(),
            tasks: RecordStore::default(),
            tickets: RecordStore::default(),
            leads: RecordStore::default(),
            customers: RecordStore::default(),
        }
    }

    /// Wire services over `config` and seed the built-in defaults.
    pub async fn bootstrap(config: ConfigStore, api_keys: Arc<dyn ApiKeyStore>) -> Result<Self, ConfigError> {
        config.ensure_defaults(system_defaults(Utc::now())).await?;
        Ok(Self::new(config, api_keys))
    }

    /// Fully in-memory services (dev/tests).
    pub async fn in_memory() -> Result<Self, ConfigError> {
        Self::bootstrap(ConfigStore::in_memory(), Arc::new(InMemoryApiKeyStore::new())).await
    }
}
