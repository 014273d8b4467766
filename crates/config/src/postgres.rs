//! Postgres-backed configuration repository.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE configurations (
//!     key            TEXT PRIMARY KEY,
//!     value          TEXT        NOT NULL,
//!     type           TEXT        NOT NULL,
//!     category       TEXT        NOT NULL,
//!     description    TEXT        NOT NULL DEFAULT '',
//!     default_value  TEXT        NOT NULL,
//!     is_system      BOOLEAN     NOT NULL DEFAULT FALSE,
//!     is_read_only   BOOLEAN     NOT NULL DEFAULT FALSE,
//!     valid_values   TEXT,
//!     created_at     TIMESTAMPTZ NOT NULL DEFAULT NOW(),
//!     updated_at     TIMESTAMPTZ NOT NULL DEFAULT NOW()
//! );
//! CREATE INDEX configurations_category_idx ON configurations (category);
//! ```
//!
//! ## Error Mapping
//!
//! Every SQLx error becomes [`ConfigError::Storage`]. A database failure is
//! never reported as a validation or access error.
//!
//! ## Concurrency
//!
//! [`ConfigRepository::update_value`] locks the row with `SELECT ... FOR UPDATE`
//! inside a transaction, runs the mutation, then writes and commits. Concurrent
//! writers of the same key serialize on the row lock.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::error::ConfigError;
use crate::model::Configuration;
use crate::repository::{ConfigRepository, ValueMutation};
use crate::value::ConfigType;

const SELECT_COLUMNS: &str = r#"
    SELECT
        key,
        value,
        type,
        category,
        description,
        default_value,
        is_system,
        is_read_only,
        valid_values,
        created_at,
        updated_at
    FROM configurations
"#;

/// Configuration repository over a shared SQLx pool.
#[derive(Debug, Clone)]
pub struct PostgresConfigRepository {
    pool: Arc<PgPool>,
}

impl PostgresConfigRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl ConfigRepository for PostgresConfigRepository {
    #[instrument(skip(self), err)]
    async fn list(&self) -> Result<Vec<Configuration>, ConfigError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} ORDER BY key ASC"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_configurations", e))?;

        rows.iter().map(row_to_configuration).collect()
    }

    #[instrument(skip(self), err)]
    async fn list_by_category(&self, category: &str) -> Result<Vec<Configuration>, ConfigError> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE category = $1 ORDER BY key ASC"))
            .bind(category)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_configurations_by_category", e))?;

        rows.iter().map(row_to_configuration).collect()
    }

    #[instrument(skip(self), err)]
    async fn get(&self, key: &str) -> Result<Option<Configuration>, ConfigError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE key = $1"))
            .bind(key)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_configuration", e))?;

        row.as_ref().map(row_to_configuration).transpose()
    }

    #[instrument(skip(self, config), fields(key = %config.key), err)]
    async fn insert_if_absent(&self, config: Configuration) -> Result<bool, ConfigError> {
        let result = sqlx::query(
            r#"
            INSERT INTO configurations (
                key,
                value,
                type,
                category,
                description,
                default_value,
                is_system,
                is_read_only,
                valid_values,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (key) DO NOTHING
            "#,
        )
        .bind(&config.key)
        .bind(&config.value)
        .bind(config.value_type.as_str())
        .bind(&config.category)
        .bind(&config.description)
        .bind(&config.default_value)
        .bind(config.is_system)
        .bind(config.is_read_only)
        .bind(&config.valid_values)
        .bind(config.created_at)
        .bind(config.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_configuration", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, mutation), err)]
    async fn update_value(
        &self,
        key: &str,
        now: DateTime<Utc>,
        mutation: ValueMutation<'_>,
    ) -> Result<Configuration, ConfigError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE key = $1 FOR UPDATE"))
            .bind(key)
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("lock_configuration", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Err(ConfigError::NotFound(key.to_string()));
        };

        let mut current = row_to_configuration(&row)?;
        let value = match mutation(&current) {
            Ok(value) => value,
            Err(e) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Err(e);
            }
        };

        sqlx::query("UPDATE configurations SET value = $2, updated_at = $3 WHERE key = $1")
            .bind(key)
            .bind(&value)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_configuration", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        current.value = value;
        current.updated_at = now;
        Ok(current)
    }
}

fn row_to_configuration(row: &PgRow) -> Result<Configuration, ConfigError> {
    let get_err = |e: sqlx::Error| map_sqlx_error("decode_configuration_row", e);

    let type_name: String = row.try_get("type").map_err(get_err)?;
    let value_type = type_name
        .parse::<ConfigType>()
        .map_err(|e| ConfigError::storage(format!("configuration row has {e}")))?;

    Ok(Configuration {
        key: row.try_get("key").map_err(get_err)?,
        value: row.try_get("value").map_err(get_err)?,
        value_type,
        category: row.try_get("category").map_err(get_err)?,
        description: row.try_get("description").map_err(get_err)?,
        default_value: row.try_get("default_value").map_err(get_err)?,
        is_system: row.try_get("is_system").map_err(get_err)?,
        is_read_only: row.try_get("is_read_only").map_err(get_err)?,
        valid_values: row.try_get("valid_values").map_err(get_err)?,
        created_at: row.try_get("created_at").map_err(get_err)?,
        updated_at: row.try_get("updated_at").map_err(get_err)?,
    })
}

/// Map SQLx errors to `ConfigError::Storage`.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> ConfigError {
    match err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();
            tracing::warn!(operation, code = %code, "configuration database error");
            ConfigError::storage(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => ConfigError::storage(format!("connection pool closed in {operation}")),
        other => ConfigError::storage(format!("sqlx error in {operation}: {other}")),
    }
}
