use axum::{routing::get, Router};

pub mod api_keys;
pub mod config;
pub mod leads;
pub mod system;
pub mod tasks;
pub mod tickets;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/config", config::router())
        .nest("/tasks", tasks::router())
        .nest("/tickets", tickets::router())
        .nest("/leads", leads::router())
        .nest("/users", users::router())
        .nest("/api-keys", api_keys::router())
}
