//! Configuration row model.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::ConfigError;
use crate::value::{ConfigType, ConfigValue};

/// A persisted configuration row.
///
/// `value` and `default_value` hold the encoded text for `value_type`; use
/// [`Configuration::typed_value`] to read them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Configuration {
    /// Unique, dot-namespaced key (e.g. `leads.conversion.allowed_statuses`).
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub value_type: ConfigType,
    /// UI grouping only.
    pub category: String,
    pub description: String,
    pub default_value: String,
    /// System rows can change value but are never deleted.
    pub is_system: bool,
    /// Read-only rows reject every Set/Reset.
    pub is_read_only: bool,
    /// Optional JSON array of acceptable values.
    pub valid_values: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Configuration {
    /// New row whose value and default are both `default`.
    pub fn new(key: impl Into<String>, default: ConfigValue, now: DateTime<Utc>) -> Self {
        let encoded = default.encode();
        Self {
            key: key.into(),
            value: encoded.clone(),
            value_type: default.config_type(),
            category: "general".to_string(),
            description: String::new(),
            default_value: encoded,
            is_system: false,
            is_read_only: false,
            valid_values: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }

    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    pub fn valid_values(mut self, values: Vec<JsonValue>) -> Self {
        self.valid_values = Some(JsonValue::Array(values).to_string());
        self
    }

    /// Current value, or the type's zero value when the stored text is malformed.
    pub fn typed_value(&self) -> ConfigValue {
        self.value_type.decode_or_zero(&self.value)
    }

    /// Default value, with the same malformed-data policy as `typed_value`.
    pub fn typed_default(&self) -> ConfigValue {
        self.value_type.decode_or_zero(&self.default_value)
    }

    /// Parsed `valid_values`. Absent or malformed lists impose no constraint.
    pub fn allowed_values(&self) -> Vec<JsonValue> {
        let Some(raw) = self.valid_values.as_deref() else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<JsonValue>>(raw) {
            Ok(values) => values,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "ignoring malformed valid_values");
                Vec::new()
            }
        }
    }

    /// Check a candidate value against `valid_values`.
    ///
    /// Membership is decided on canonical encodings; array values are checked
    /// element by element so ordering never matters.
    pub fn ensure_allowed(&self, candidate: &ConfigValue) -> Result<(), ConfigError> {
        let allowed = self.allowed_values();
        if allowed.is_empty() {
            return Ok(());
        }

        let allowed: HashSet<String> = allowed
            .iter()
            .filter_map(|entry| self.value_type.canonical_entry(entry))
            .collect();

        match candidate
            .canonical_members()
            .into_iter()
            .find(|member| !allowed.contains(member))
        {
            Some(rejected) => Err(ConfigError::invalid(format!(
                "{rejected} is not an allowed value for '{}'",
                self.key
            ))),
            None => Ok(()),
        }
    }

    /// Structural check for rows about to be persisted (e.g. seeded defaults).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.key.trim().is_empty() {
            return Err(ConfigError::invalid("configuration key cannot be empty"));
        }
        self.value_type.decode(&self.default_value)?;
        let value = self.value_type.decode(&self.value)?;
        if let Some(raw) = self.valid_values.as_deref() {
            serde_json::from_str::<Vec<JsonValue>>(raw)
                .map_err(|e| ConfigError::invalid(format!("valid_values for '{}': {e}", self.key)))?;
        }
        self.ensure_allowed(&value)
    }
}
