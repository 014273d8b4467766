use axum::{
    extract::State,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use forgecrm_auth::{Credential, PrincipalResolver};
use forgecrm_config::{ConfigError, ConfigStore, API_KEYS_ENABLED};
use forgecrm_policy::AuthzError;

use crate::app::errors::authz_error_to_response;

#[derive(Clone)]
pub struct AuthState {
    pub resolver: PrincipalResolver,
    pub config: ConfigStore,
}

impl AuthState {
    /// `auth.api_keys.enabled`, re-read per request. A missing row means enabled.
    async fn api_keys_enabled(&self) -> Result<bool, AuthzError> {
        match self.config.get_value(API_KEYS_ENABLED).await {
            Ok(value) => Ok(value.as_bool().unwrap_or(false)),
            Err(ConfigError::NotFound(_)) => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

/// Resolve the `Authorization` header into a [`forgecrm_auth::Principal`]
/// request extension, or answer 401 without reaching the handler.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let Some(credential) = Credential::parse(header) else {
        return authz_error_to_response(AuthzError::Unauthenticated);
    };

    if let Credential::ApiKey(_) = credential {
        match state.api_keys_enabled().await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("api key presented while api keys are disabled");
                return authz_error_to_response(AuthzError::Unauthenticated);
            }
            Err(e) => return authz_error_to_response(e),
        }
    }

    let principal = match state.resolver.resolve_credential(credential, Utc::now()).await {
        Ok(principal) => principal,
        Err(e) => return authz_error_to_response(e.into()),
    };

    req.extensions_mut().insert(principal);
    next.run(req).await
}
