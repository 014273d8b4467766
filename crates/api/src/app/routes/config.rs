//! Configuration management surface.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use forgecrm_auth::Principal;
use forgecrm_config::{Configuration, UI_CATEGORY};
use forgecrm_policy::{Action, Resource, ResourceType};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_all))
        .route("/ui", get(list_ui))
        .route("/category/:category", get(list_by_category))
        .route("/:key", get(get_by_key).put(set_value))
        .route("/:key/reset", post(reset_value))
}

/// Every row. Admin only.
pub async fn list_all(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    services
        .policy
        .authorize_action(&principal, ResourceType::Configuration, Action::ListAll)?;
    let rows = services.config.get_all().await?;
    Ok(items(&rows))
}

/// UI-safe subset, for any authenticated principal.
pub async fn list_ui(Extension(services): Extension<Arc<AppServices>>) -> Result<impl IntoResponse, ApiError> {
    let rows = services.config.get_by_category(UI_CATEGORY).await?;
    Ok(items(&rows))
}

pub async fn list_by_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(category): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let rows = services.config.get_by_category(&category).await?;
    let readable: Vec<Configuration> = rows
        .into_iter()
        .filter(|row| {
            services
                .policy
                .authorize(&principal, Action::Read, &Resource::Configuration(row))
                .is_ok()
        })
        .collect();
    Ok(items(&readable))
}

pub async fn get_by_key(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = services.config.get_by_key(&key).await?;
    services
        .policy
        .authorize(&principal, Action::Read, &Resource::Configuration(&row))?;
    Ok(Json(dto::config_to_json(&row)))
}

/// Admin only. `ReadOnly` and `InvalidValue` surface as distinct 400 codes.
pub async fn set_value(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(key): Path<String>,
    Json(body): Json<dto::SetConfigRequest>,
) -> Result<impl IntoResponse, ApiError> {
    services
        .policy
        .authorize_action(&principal, ResourceType::Configuration, Action::Update)?;
    let row = services.config.set(&key, &body.value).await?;
    tracing::info!(key = %key, principal_id = %principal.id, "configuration changed");
    Ok(Json(dto::config_to_json(&row)))
}

pub async fn reset_value(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    services
        .policy
        .authorize_action(&principal, ResourceType::Configuration, Action::Reset)?;
    let row = services.config.reset(&key).await?;
    tracing::info!(key = %key, principal_id = %principal.id, "configuration reset");
    Ok(Json(dto::config_to_json(&row)))
}

fn items(rows: &[Configuration]) -> impl IntoResponse + use<> {
    let items = rows.iter().map(dto::config_to_json).collect::<Vec<_>>();
    (StatusCode::OK, Json(json!({ "items": items })))
}
