//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: configuration store, policy engine, record stores
//! - `routes/`: HTTP routes + handlers (one file per resource)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use forgecrm_auth::{Hs256JwtValidator, PrincipalResolver};

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router over already-wired services.
pub fn build_app(services: Arc<AppServices>, jwt_secret: &str) -> Router {
    let resolver = PrincipalResolver::new(Arc::new(Hs256JwtValidator::new(jwt_secret)))
        .with_api_keys(services.api_keys.clone());
    let auth_state = middleware::AuthState {
        resolver,
        config: services.config.clone(),
    };

    // Protected routes: require a resolved principal.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
