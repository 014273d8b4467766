//! `forgecrm-auth`: authentication boundary.
//!
//! Turns an inbound credential into a [`Principal`]. This crate is decoupled
//! from HTTP: callers hand over the raw `Authorization` header value.

pub mod api_keys;
pub mod claims;
pub mod jwt;
pub mod principal;
pub mod resolver;
pub mod roles;

pub use api_keys::{
    hash_api_key, issue_api_key, ApiKeyId, ApiKeyRecord, ApiKeyStore, ApiKeyStoreError,
    InMemoryApiKeyStore, IssuedApiKey, API_KEY_PREFIX,
};
pub use claims::{validate_claims, JwtClaims, TokenValidationError};
pub use jwt::{Hs256JwtValidator, Hs256TokenIssuer, JwtError, JwtValidator};
pub use principal::Principal;
pub use resolver::{Credential, PrincipalResolver, ResolveError};
pub use roles::{Role, UnknownRole};
