//! Credential → [`Principal`] resolution.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::api_keys::{hash_api_key, ApiKeyStore};
use crate::jwt::JwtValidator;
use crate::Principal;

/// A parsed `Authorization` header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Credential<'a> {
    Bearer(&'a str),
    ApiKey(&'a str),
}

impl<'a> Credential<'a> {
    /// Parse `Bearer <token>` or `ApiKey <key>`. Scheme names are
    /// case-insensitive; anything else, including an empty token, is `None`.
    pub fn parse(header: Option<&'a str>) -> Option<Self> {
        let (scheme, token) = header?.trim().split_once(char::is_whitespace)?;
        let token = token.trim();
        if token.is_empty() {
            return None;
        }

        if scheme.eq_ignore_ascii_case("bearer") {
            Some(Credential::Bearer(token))
        } else if scheme.eq_ignore_ascii_case("apikey") {
            Some(Credential::ApiKey(token))
        } else {
            None
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Any credential problem: missing, unknown scheme, bad/expired token,
    /// unknown/revoked/expired key. Deliberately carries no detail.
    #[error("unauthenticated")]
    Unauthenticated,

    /// The key store could not be consulted.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Resolves either credential shape into the same [`Principal`].
#[derive(Clone)]
pub struct PrincipalResolver {
    jwt: Arc<dyn JwtValidator>,
    api_keys: Option<Arc<dyn ApiKeyStore>>,
}

impl PrincipalResolver {
    pub fn new(jwt: Arc<dyn JwtValidator>) -> Self {
        Self { jwt, api_keys: None }
    }

    /// Also accept `ApiKey` credentials looked up in `store`.
    pub fn with_api_keys(mut self, store: Arc<dyn ApiKeyStore>) -> Self {
        self.api_keys = Some(store);
        self
    }

    pub async fn resolve(&self, header: Option<&str>, now: DateTime<Utc>) -> Result<Principal, ResolveError> {
        let Some(credential) = Credential::parse(header) else {
            tracing::debug!("missing or unsupported authorization header");
            return Err(ResolveError::Unauthenticated);
        };
        self.resolve_credential(credential, now).await
    }

    pub async fn resolve_credential(
        &self,
        credential: Credential<'_>,
        now: DateTime<Utc>,
    ) -> Result<Principal, ResolveError> {
        match credential {
            Credential::Bearer(token) => match self.jwt.validate(token, now) {
                Ok(claims) => Ok(claims.principal()),
                Err(e) => {
                    tracing::debug!(error = %e, "bearer token rejected");
                    Err(ResolveError::Unauthenticated)
                }
            },
            Credential::ApiKey(key) => {
                let Some(store) = &self.api_keys else {
                    tracing::debug!("api key presented but api keys are not enabled");
                    return Err(ResolveError::Unauthenticated);
                };

                let record = store.find_by_hash(&hash_api_key(key)).await.map_err(|e| {
                    tracing::error!(error = %e, "api key lookup failed");
                    ResolveError::Internal(e.to_string())
                })?;

                match record {
                    Some(record) if record.is_active(now) => Ok(record.principal()),
                    Some(record) => {
                        tracing::debug!(key_id = %record.id, "inactive api key presented");
                        Err(ResolveError::Unauthenticated)
                    }
                    None => {
                        tracing::debug!("unknown api key presented");
                        Err(ResolveError::Unauthenticated)
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_keys::{
        issue_api_key, ApiKeyId, ApiKeyRecord, ApiKeyStoreError, InMemoryApiKeyStore,
    };
    use crate::jwt::{Hs256JwtValidator, Hs256TokenIssuer};
    use crate::Role;
    use async_trait::async_trait;
    use chrono::Duration;
    use forgecrm_core::UserId;

    const SECRET: &str = "resolver-secret";

    fn resolver(store: Arc<InMemoryApiKeyStore>) -> PrincipalResolver {
        PrincipalResolver::new(Arc::new(Hs256JwtValidator::new(SECRET))).with_api_keys(store)
    }

    #[test]
    fn parses_both_schemes_case_insensitively() {
        assert_eq!(Credential::parse(Some("Bearer abc")), Some(Credential::Bearer("abc")));
        assert_eq!(Credential::parse(Some("bearer   abc ")), Some(Credential::Bearer("abc")));
        assert_eq!(Credential::parse(Some("APIKEY fcrm_x")), Some(Credential::ApiKey("fcrm_x")));
    }

    #[test]
    fn rejects_unknown_or_empty_credentials() {
        assert_eq!(Credential::parse(None), None);
        assert_eq!(Credential::parse(Some("")), None);
        assert_eq!(Credential::parse(Some("Bearer")), None);
        assert_eq!(Credential::parse(Some("Bearer   ")), None);
        assert_eq!(Credential::parse(Some("Basic dXNlcjpwYXNz")), None);
    }

    #[tokio::test]
    async fn bearer_and_api_key_resolve_to_the_same_principal_shape() {
        let store = Arc::new(InMemoryApiKeyStore::new());
        let resolver = resolver(store.clone());
        let user = UserId::new();
        let now = Utc::now();

        let token = Hs256TokenIssuer::new(SECRET, Duration::minutes(5))
            .issue(user, Role::Sales, now)
            .unwrap();
        let issued = issue_api_key(&*store, user, Role::Sales, "cli", None, now).await.unwrap();

        let via_jwt = resolver.resolve(Some(&format!("Bearer {token}")), now).await.unwrap();
        let via_key = resolver
            .resolve(Some(&format!("ApiKey {}", issued.plaintext)), now)
            .await
            .unwrap();
        assert_eq!(via_jwt, Principal::new(user, Role::Sales));
        assert_eq!(via_jwt, via_key);
    }

    #[tokio::test]
    async fn every_credential_failure_is_unauthenticated() {
        let store = Arc::new(InMemoryApiKeyStore::new());
        let resolver = resolver(store.clone());
        let now = Utc::now();

        let expired = Hs256TokenIssuer::new(SECRET, Duration::minutes(5))
            .issue(UserId::new(), Role::Admin, now - Duration::hours(1))
            .unwrap();
        let revoked = issue_api_key(&*store, UserId::new(), Role::Admin, "old", None, now)
            .await
            .unwrap();
        store.revoke(revoked.record.id, now).await.unwrap();
        let lapsed = issue_api_key(&*store, UserId::new(), Role::Admin, "tmp", Some(now), now)
            .await
            .unwrap();

        for header in [
            None,
            Some("Token abc".to_string()),
            Some("Bearer not-a-jwt".to_string()),
            Some(format!("Bearer {expired}")),
            Some("ApiKey fcrm_unknown".to_string()),
            Some(format!("ApiKey {}", revoked.plaintext)),
            Some(format!("ApiKey {}", lapsed.plaintext)),
        ] {
            assert_eq!(
                resolver.resolve(header.as_deref(), now).await,
                Err(ResolveError::Unauthenticated),
                "header {header:?}"
            );
        }
    }

    #[tokio::test]
    async fn api_keys_are_rejected_when_no_store_is_configured() {
        let resolver = PrincipalResolver::new(Arc::new(Hs256JwtValidator::new(SECRET)));
        assert_eq!(
            resolver.resolve(Some("ApiKey fcrm_abc"), Utc::now()).await,
            Err(ResolveError::Unauthenticated)
        );
    }

    struct BrokenStore;

    #[async_trait]
    impl ApiKeyStore for BrokenStore {
        async fn insert(&self, _: ApiKeyRecord) -> Result<(), ApiKeyStoreError> {
            Err(ApiKeyStoreError::Storage("down".into()))
        }
        async fn find_by_hash(&self, _: &str) -> Result<Option<ApiKeyRecord>, ApiKeyStoreError> {
            Err(ApiKeyStoreError::Storage("down".into()))
        }
        async fn list_for_user(&self, _: UserId) -> Result<Vec<ApiKeyRecord>, ApiKeyStoreError> {
            Err(ApiKeyStoreError::Storage("down".into()))
        }
        async fn revoke(&self, _: ApiKeyId, _: DateTime<Utc>) -> Result<ApiKeyRecord, ApiKeyStoreError> {
            Err(ApiKeyStoreError::Storage("down".into()))
        }
    }

    #[tokio::test]
    async fn key_store_outage_is_internal_not_unauthenticated() {
        let resolver = PrincipalResolver::new(Arc::new(Hs256JwtValidator::new(SECRET)))
            .with_api_keys(Arc::new(BrokenStore));
        assert!(matches!(
            resolver.resolve(Some("ApiKey fcrm_abc"), Utc::now()).await,
            Err(ResolveError::Internal(_))
        ));
    }
}
