//! Consistent JSON error responses: `{ "error": code, "message": msg }`.
//!
//! Messages are generic; details go to the log only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use forgecrm_auth::ApiKeyStoreError;
use forgecrm_config::ConfigError;
use forgecrm_core::DomainError;
use forgecrm_policy::AuthzError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Handler error, rendered through [`json_error`].
#[derive(Debug)]
pub enum ApiError {
    Authz(AuthzError),
    Config(ConfigError),
    BadRequest(String),
}

impl From<AuthzError> for ApiError {
    fn from(value: AuthzError) -> Self {
        Self::Authz(value)
    }
}

impl From<ConfigError> for ApiError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<DomainError> for ApiError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => Self::BadRequest(msg),
            other => Self::Authz(other.into()),
        }
    }
}

impl From<ApiKeyStoreError> for ApiError {
    fn from(value: ApiKeyStoreError) -> Self {
        match value {
            ApiKeyStoreError::NotFound => Self::not_found(),
            other => Self::Authz(AuthzError::internal(other.to_string())),
        }
    }
}

impl ApiError {
    pub fn not_found() -> Self {
        Self::Authz(AuthzError::NotFound)
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Authz(e) => authz_error_to_response(e),
            ApiError::Config(e) => config_error_to_response(e),
            ApiError::BadRequest(msg) => json_error(StatusCode::BAD_REQUEST, "bad_request", msg),
        }
    }
}

pub fn authz_error_to_response(err: AuthzError) -> Response {
    match err {
        AuthzError::Unauthenticated => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required")
        }
        AuthzError::Forbidden => json_error(StatusCode::FORBIDDEN, "forbidden", "insufficient permissions"),
        AuthzError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        AuthzError::InvalidStateTransition(detail) => {
            tracing::debug!(detail = %detail, "state transition rejected");
            json_error(
                StatusCode::BAD_REQUEST,
                "invalid_state_transition",
                "the requested status change is not allowed",
            )
        }
        AuthzError::Internal(detail) => internal(detail),
    }
}

pub fn config_error_to_response(err: ConfigError) -> Response {
    match err {
        ConfigError::NotFound(_) => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        ConfigError::ReadOnly(_) => {
            json_error(StatusCode::BAD_REQUEST, "read_only", "configuration is read-only")
        }
        ConfigError::InvalidValue(detail) => {
            tracing::debug!(detail = %detail, "configuration value rejected");
            json_error(
                StatusCode::BAD_REQUEST,
                "invalid_value",
                "value is not valid for this configuration",
            )
        }
        ConfigError::Storage(detail) => internal(detail),
    }
}

fn internal(detail: String) -> Response {
    tracing::error!(detail = %detail, "internal error");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", "internal error")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        let cases = [
            (ApiError::Authz(AuthzError::Unauthenticated), StatusCode::UNAUTHORIZED),
            (ApiError::Authz(AuthzError::Forbidden), StatusCode::FORBIDDEN),
            (ApiError::Authz(AuthzError::NotFound), StatusCode::NOT_FOUND),
            (ApiError::Authz(AuthzError::InvalidStateTransition("x".into())), StatusCode::BAD_REQUEST),
            (ApiError::Authz(AuthzError::Internal("db".into())), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::Config(ConfigError::ReadOnly("k".into())), StatusCode::BAD_REQUEST),
            (ApiError::Config(ConfigError::invalid("x")), StatusCode::BAD_REQUEST),
            (ApiError::Config(ConfigError::NotFound("k".into())), StatusCode::NOT_FOUND),
            (ApiError::Config(ConfigError::storage("db")), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn domain_transition_errors_become_state_errors() {
        let err: ApiError = DomainError::transition("closed", "open").into();
        assert!(matches!(err, ApiError::Authz(AuthzError::InvalidStateTransition(_))));
    }
}
