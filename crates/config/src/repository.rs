//! Configuration persistence abstraction.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::ConfigError;
use crate::model::Configuration;

/// Computes the new encoded `value` from the current row.
///
/// Runs while the repository holds the row lock, so validation and write are a
/// single read-modify-write step.
pub type ValueMutation<'a> =
    Box<dyn FnOnce(&Configuration) -> Result<String, ConfigError> + Send + 'a>;

/// Row store for configurations, keyed by unique `key`.
///
/// There is deliberately no delete operation.
#[async_trait]
pub trait ConfigRepository: Send + Sync {
    /// All rows, ordered by key.
    async fn list(&self) -> Result<Vec<Configuration>, ConfigError>;

    /// Rows of one category, ordered by key.
    async fn list_by_category(&self, category: &str) -> Result<Vec<Configuration>, ConfigError>;

    async fn get(&self, key: &str) -> Result<Option<Configuration>, ConfigError>;

    /// Insert `config` unless its key already exists. Returns whether a row was inserted.
    async fn insert_if_absent(&self, config: Configuration) -> Result<bool, ConfigError>;

    /// Replace the value of `key` with the output of `mutation`, atomically
    /// with respect to other writers of the same row.
    async fn update_value(
        &self,
        key: &str,
        now: DateTime<Utc>,
        mutation: ValueMutation<'_>,
    ) -> Result<Configuration, ConfigError>;
}

#[async_trait]
impl<S> ConfigRepository for Arc<S>
where
    S: ConfigRepository + ?Sized,
{
    async fn list(&self) -> Result<Vec<Configuration>, ConfigError> {
        (**self).list().await
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Configuration>, ConfigError> {
        (**self).list_by_category(category).await
    }

    async fn get(&self, key: &str) -> Result<Option<Configuration>, ConfigError> {
        (**self).get(key).await
    }

    async fn insert_if_absent(&self, config: Configuration) -> Result<bool, ConfigError> {
        (**self).insert_if_absent(config).await
    }

    async fn update_value(
        &self,
        key: &str,
        now: DateTime<Utc>,
        mutation: ValueMutation<'_>,
    ) -> Result<Configuration, ConfigError> {
        (**self).update_value(key, now, mutation).await
    }
}

/// In-memory configuration store for tests/dev.
///
/// A single `RwLock` guards the map: readers see either the old or the new
/// row, never a partially written one.
#[derive(Debug, Default)]
pub struct InMemoryConfigRepository {
    rows: RwLock<BTreeMap<String, Configuration>>,
}

impl InMemoryConfigRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn poisoned() -> ConfigError {
        ConfigError::storage("configuration store lock poisoned")
    }
}

#[async_trait]
impl ConfigRepository for InMemoryConfigRepository {
    async fn list(&self) -> Result<Vec<Configuration>, ConfigError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows.values().cloned().collect())
    }

    async fn list_by_category(&self, category: &str) -> Result<Vec<Configuration>, ConfigError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows
            .values()
            .filter(|row| row.category == category)
            .cloned()
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Option<Configuration>, ConfigError> {
        let rows = self.rows.read().map_err(|_| Self::poisoned())?;
        Ok(rows.get(key).cloned())
    }

    async fn insert_if_absent(&self, config: Configuration) -> Result<bool, ConfigError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
        if rows.contains_key(&config.key) {
            return Ok(false);
        }
        rows.insert(config.key.clone(), config);
        Ok(true)
    }

    async fn update_value(
        &self,
        key: &str,
        now: DateTime<Utc>,
        mutation: ValueMutation<'_>,
    ) -> Result<Configuration, ConfigError> {
        let mut rows = self.rows.write().map_err(|_| Self::poisoned())?;
        let row = rows
            .get_mut(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?;

        let value = mutation(&*row)?;
        row.value = value;
        row.updated_at = now;
        Ok(row.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ConfigValue;

    fn row(key: &str, category: &str) -> Configuration {
        Configuration::new(key, ConfigValue::Boolean(true), Utc::now()).category(category)
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_the_first_row() {
        let repo = InMemoryConfigRepository::new();
        assert!(repo.insert_if_absent(row("a.flag", "ui")).await.unwrap());

        let mut replacement = row("a.flag", "ui");
        replacement.value = "false".into();
        assert!(!repo.insert_if_absent(replacement).await.unwrap());

        assert_eq!(repo.get("a.flag").await.unwrap().unwrap().value, "true");
    }

    #[tokio::test]
    async fn list_is_ordered_and_filterable() {
        let repo = InMemoryConfigRepository::new();
        repo.insert_if_absent(row("z.last", "ui")).await.unwrap();
        repo.insert_if_absent(row("a.first", "leads")).await.unwrap();

        let keys: Vec<_> = repo.list().await.unwrap().into_iter().map(|r| r.key).collect();
        assert_eq!(keys, vec!["a.first", "z.last"]);

        let ui = repo.list_by_category("ui").await.unwrap();
        assert_eq!(ui.len(), 1);
        assert_eq!(ui[0].key, "z.last");
    }

    #[tokio::test]
    async fn failed_mutation_leaves_row_untouched() {
        let repo = InMemoryConfigRepository::new();
        repo.insert_if_absent(row("a.flag", "ui")).await.unwrap();

        let err = repo
            .update_value("a.flag", Utc::now(), Box::new(|_: &Configuration| Err(ConfigError::invalid("nope"))))
            .await
            .unwrap_err();
        assert_eq!(err, ConfigError::invalid("nope"));
        assert_eq!(repo.get("a.flag").await.unwrap().unwrap().value, "true");
    }

    #[tokio::test]
    async fn update_of_unknown_key_is_not_found() {
        let repo = InMemoryConfigRepository::new();
        let err = repo
            .update_value("missing", Utc::now(), Box::new(|_: &Configuration| Ok("x".into())))
            .await
            .unwrap_err();
        assert_eq!(err, ConfigError::NotFound("missing".into()));
    }
}
