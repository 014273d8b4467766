use thiserror::Error;

use crate::value::ValueError;

/// Configuration store error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("configuration '{0}' not found")]
    NotFound(String),

    /// Mutation attempted on a read-only row (regardless of caller privilege).
    #[error("configuration '{0}' is read-only")]
    ReadOnly(String),

    /// Value failed type coercion or is not one of the row's valid values.
    #[error("invalid value: {0}")]
    InvalidValue(String),

    /// Persistence failure. Never to be reported as a validation or access error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl ConfigError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidValue(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }
}

impl From<ValueError> for ConfigError {
    fn from(value: ValueError) -> Self {
        Self::InvalidValue(value.to_string())
    }
}
