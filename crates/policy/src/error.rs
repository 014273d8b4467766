use thiserror::Error;

use forgecrm_auth::ResolveError;
use forgecrm_config::ConfigError;
use forgecrm_core::DomainError;

/// Authorization outcome surfaced to request handlers.
///
/// Messages are generic on purpose; the detailed reason stays in logs.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    Unauthenticated,

    #[error("insufficient permissions")]
    Forbidden,

    #[error("not found")]
    NotFound,

    /// The principal may act, but the resource's state machine refuses.
    #[error("{0}")]
    InvalidStateTransition(String),

    /// Persistence or configuration failure. Never reported as `Forbidden`.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthzError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<DomainError> for AuthzError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::InvalidStateTransition { .. } => Self::InvalidStateTransition(value.to_string()),
            DomainError::NotFound => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<ResolveError> for AuthzError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::Unauthenticated => Self::Unauthenticated,
            ResolveError::Internal(msg) => Self::Internal(msg),
        }
    }
}

impl From<ConfigError> for AuthzError {
    fn from(value: ConfigError) -> Self {
        Self::Internal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_machine_errors_keep_their_kind() {
        let err: AuthzError = DomainError::transition("completed", "pending").into();
        assert!(matches!(err, AuthzError::InvalidStateTransition(_)));
    }

    #[test]
    fn configuration_failures_are_internal() {
        let err: AuthzError = ConfigError::storage("connection reset").into();
        assert!(matches!(err, AuthzError::Internal(_)));
        assert_eq!(AuthzError::Forbidden.to_string(), "insufficient permissions");
    }
}
