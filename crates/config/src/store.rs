//! Configuration service: typed reads, validated writes, idempotent seeding.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value as JsonValue;

use crate::error::ConfigError;
use crate::model::Configuration;
use crate::repository::{ConfigRepository, InMemoryConfigRepository};
use crate::value::ConfigValue;

/// Entry point for reading and mutating configuration.
///
/// Cheap to clone; clones share the underlying repository. Nothing is cached:
/// every read goes to the repository so a Set is visible to the next caller.
#[derive(Clone)]
pub struct ConfigStore {
    repo: Arc<dyn ConfigRepository>,
}

impl core::fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConfigStore").finish_non_exhaustive()
    }
}

impl ConfigStore {
    pub fn new(repo: Arc<dyn ConfigRepository>) -> Self {
        Self { repo }
    }

    /// Store backed by a fresh [`InMemoryConfigRepository`].
    pub fn in_memory() -> Self {
        Self::new(InMemoryConfigRepository::arc())
    }

    pub async fn get_all(&self) -> Result<Vec<Configuration>, ConfigError> {
        self.repo.list().await
    }

    pub async fn get_by_category(&self, category: &str) -> Result<Vec<Configuration>, ConfigError> {
        self.repo.list_by_category(category).await
    }

    pub async fn get_by_key(&self, key: &str) -> Result<Configuration, ConfigError> {
        self.repo
            .get(key)
            .await?
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))
    }

    /// Decoded value of `config` (zero value for malformed rows).
    pub fn typed_value(config: &Configuration) -> ConfigValue {
        config.typed_value()
    }

    /// Current decoded value of `key`.
    pub async fn get_value(&self, key: &str) -> Result<ConfigValue, ConfigError> {
        Ok(self.get_by_key(key).await?.typed_value())
    }

    /// String elements of an array-typed setting.
    pub async fn get_string_list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
        Ok(self.get_value(key).await?.string_items())
    }

    /// Validate and store a new value for `key`.
    ///
    /// Fails with `ReadOnly` for read-only rows whoever the caller is, and with
    /// `InvalidValue` when `raw` does not coerce to the row's type or is not
    /// among its valid values.
    pub async fn set(&self, key: &str, raw: &JsonValue) -> Result<Configuration, ConfigError> {
        let raw = raw.clone();
        let result = self
            .repo
            .update_value(
                key,
                Utc::now(),
                Box::new(move |current: &Configuration| {
                    ensure_writable(current)?;
                    let value = current.value_type.coerce(&raw)?;
                    current.ensure_allowed(&value)?;
                    Ok(value.encode())
                }),
            )
            .await;

        log_mutation("set", key, &result);
        result
    }

    /// Restore `key` to its default value.
    pub async fn reset(&self, key: &str) -> Result<Configuration, ConfigError> {
        let result = self
            .repo
            .update_value(
                key,
                Utc::now(),
                Box::new(|current: &Configuration| {
                    ensure_writable(current)?;
                    Ok(current.default_value.clone())
                }),
            )
            .await;

        log_mutation("reset", key, &result);
        result
    }

    /// Seed rows whose key does not exist yet. Existing rows, including values
    /// an operator has changed, are left alone.
    ///
    /// Returns the number of rows inserted.
    pub async fn ensure_defaults(&self, defaults: Vec<Configuration>) -> Result<usize, ConfigError> {
        let mut inserted = 0;
        for config in defaults {
            config.validate()?;
            let key = config.key.clone();
            if self.repo.insert_if_absent(config).await? {
                tracing::debug!(key = %key, "seeded default configuration");
                inserted += 1;
            }
        }
        tracing::info!(inserted, "configuration defaults ensured");
        Ok(inserted)
    }
}

fn ensure_writable(config: &Configuration) -> Result<(), ConfigError> {
    if config.is_read_only {
        return Err(ConfigError::ReadOnly(config.key.clone()));
    }
    Ok(())
}

fn log_mutation(operation: &'static str, key: &str, result: &Result<Configuration, ConfigError>) {
    match result {
        Ok(config) => tracing::info!(operation, key, value_type = %config.value_type, "configuration updated"),
        Err(ConfigError::Storage(e)) => tracing::error!(operation, key, error = %e, "configuration write failed"),
        Err(e) => tracing::debug!(operation, key, error = %e, "configuration write rejected"),
    }
}
