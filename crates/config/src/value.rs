//! Type tags and typed values for configuration rows.
//!
//! Storage format per type:
//!
//! | type      | stored text                          |
//! |-----------|--------------------------------------|
//! | `string`  | the string itself                    |
//! | `boolean` | `true` / `false`                     |
//! | `integer` | base-10 `i64`                        |
//! | `float`   | shortest round-tripping `f64` text   |
//! | `json`    | compact JSON (object keys sorted)    |
//! | `array`   | compact JSON array                   |

use core::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Declared type of a configuration row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigType {
    String,
    Boolean,
    Integer,
    Float,
    Json,
    Array,
}

/// A stored value or inbound value that does not fit the declared type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected {expected} value: {detail}")]
pub struct ValueError {
    pub expected: ConfigType,
    pub detail: String,
}

impl ValueError {
    fn new(expected: ConfigType, detail: impl Into<String>) -> Self {
        Self {
            expected,
            detail: detail.into(),
        }
    }
}

impl ConfigType {
    pub const ALL: [ConfigType; 6] = [
        ConfigType::String,
        ConfigType::Boolean,
        ConfigType::Integer,
        ConfigType::Float,
        ConfigType::Json,
        ConfigType::Array,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigType::String => "string",
            ConfigType::Boolean => "boolean",
            ConfigType::Integer => "integer",
            ConfigType::Float => "float",
            ConfigType::Json => "json",
            ConfigType::Array => "array",
        }
    }

    /// Value reported for rows whose stored text cannot be decoded.
    pub fn zero(self) -> ConfigValue {
        match self {
            ConfigType::String => ConfigValue::String(String::new()),
            ConfigType::Boolean => ConfigValue::Boolean(false),
            ConfigType::Integer => ConfigValue::Integer(0),
            ConfigType::Float => ConfigValue::Float(0.0),
            ConfigType::Json => ConfigValue::Json(JsonValue::Null),
            ConfigType::Array => ConfigValue::Array(Vec::new()),
        }
    }

    /// Decode stored text, failing on malformed data.
    pub fn decode(self, raw: &str) -> Result<ConfigValue, ValueError> {
        match self {
            ConfigType::String => Ok(ConfigValue::String(raw.to_string())),
            ConfigType::Boolean => match raw.trim() {
                "true" => Ok(ConfigValue::Boolean(true)),
                "false" => Ok(ConfigValue::Boolean(false)),
                other => Err(ValueError::new(self, format!("'{other}' is not true/false"))),
            },
            ConfigType::Integer => raw
                .trim()
                .parse::<i64>()
                .map(ConfigValue::Integer)
                .map_err(|e| ValueError::new(self, e.to_string())),
            ConfigType::Float => raw
                .trim()
                .parse::<f64>()
                .map(ConfigValue::Float)
                .map_err(|e| ValueError::new(self, e.to_string())),
            ConfigType::Json => serde_json::from_str::<JsonValue>(raw)
                .map(ConfigValue::Json)
                .map_err(|e| ValueError::new(self, e.to_string())),
            ConfigType::Array => serde_json::from_str::<Vec<JsonValue>>(raw)
                .map(ConfigValue::Array)
                .map_err(|e| ValueError::new(self, e.to_string())),
        }
    }

    /// Decode stored text, substituting [`ConfigType::zero`] for malformed data.
    ///
    /// A corrupt row must not fail unrelated reads.
    pub fn decode_or_zero(self, raw: &str) -> ConfigValue {
        match self.decode(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(config_type = self.as_str(), error = %e, "malformed configuration value; using zero value");
                self.zero()
            }
        }
    }

    /// Coerce an inbound JSON value (e.g. an HTTP request body) into this type.
    ///
    /// Scalars are also accepted in their textual form (`"42"`, `"true"`).
    pub fn coerce(self, input: &JsonValue) -> Result<ConfigValue, ValueError> {
        match (self, input) {
            (ConfigType::String, JsonValue::String(s)) => Ok(ConfigValue::String(s.clone())),
            (ConfigType::Boolean, JsonValue::Bool(b)) => Ok(ConfigValue::Boolean(*b)),
            (ConfigType::Integer, JsonValue::Number(n)) => n
                .as_i64()
                .map(ConfigValue::Integer)
                .ok_or_else(|| ValueError::new(self, format!("{n} is not a 64-bit integer"))),
            (ConfigType::Float, JsonValue::Number(n)) => n
                .as_f64()
                .map(ConfigValue::Float)
                .ok_or_else(|| ValueError::new(self, format!("{n} is not representable as f64"))),
            (ConfigType::Boolean | ConfigType::Integer | ConfigType::Float, JsonValue::String(s)) => {
                self.decode(s)
            }
            (ConfigType::Json, value) => Ok(ConfigValue::Json(value.clone())),
            (ConfigType::Array, JsonValue::Array(items)) => Ok(ConfigValue::Array(items.clone())),
            (_, other) => Err(ValueError::new(self, format!("got {}", json_kind(other)))),
        }
    }

    /// Canonical text of one `valid_values` entry.
    ///
    /// For `array` rows an entry constrains a single element, so entries are
    /// compared element-wise rather than against the whole array.
    pub fn canonical_entry(self, entry: &JsonValue) -> Option<String> {
        match self {
            ConfigType::Array => Some(entry.to_string()),
            ty => ty.coerce(entry).ok().map(|value| value.encode()),
        }
    }
}

impl core::fmt::Display for ConfigType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigType {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigType::ALL
            .into_iter()
            .find(|ty| ty.as_str() == s)
            .ok_or_else(|| ValueError::new(ConfigType::String, format!("unknown configuration type '{s}'")))
    }
}

/// A decoded configuration value. Serializes as the bare JSON value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ConfigValue {
    String(String),
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Json(JsonValue),
    Array(Vec<JsonValue>),
}

impl ConfigValue {
    pub fn config_type(&self) -> ConfigType {
        match self {
            ConfigValue::String(_) => ConfigType::String,
            ConfigValue::Boolean(_) => ConfigType::Boolean,
            ConfigValue::Integer(_) => ConfigType::Integer,
            ConfigValue::Float(_) => ConfigType::Float,
            ConfigValue::Json(_) => ConfigType::Json,
            ConfigValue::Array(_) => ConfigType::Array,
        }
    }

    /// Storage text for this value. Inverse of [`ConfigType::decode`].
    pub fn encode(&self) -> String {
        match self {
            ConfigValue::String(s) => s.clone(),
            ConfigValue::Boolean(b) => b.to_string(),
            ConfigValue::Integer(i) => i.to_string(),
            ConfigValue::Float(f) => f.to_string(),
            ConfigValue::Json(v) => v.to_string(),
            ConfigValue::Array(items) => JsonValue::Array(items.clone()).to_string(),
        }
    }

    /// Canonical texts checked against `valid_values`: one per array element,
    /// otherwise the encoded value itself.
    pub fn canonical_members(&self) -> Vec<String> {
        match self {
            ConfigValue::Array(items) => items.iter().map(JsonValue::to_string).collect(),
            other => vec![other.encode()],
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            ConfigValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// String elements of an array value; non-string elements are skipped.
    pub fn string_items(&self) -> Vec<String> {
        self.as_array()
            .unwrap_or_default()
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect()
    }
}

fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
