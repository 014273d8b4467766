use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use forgecrm_auth::Principal;
use forgecrm_core::UserId;
use forgecrm_entities::User;
use forgecrm_policy::{Action, Resource};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    services.policy.authorize_user_list(&principal)?;
    let items = services
        .users
        .list()?
        .iter()
        .map(dto::to_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(json!({ "items": items })))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = load(&services, &id)?;
    services
        .policy
        .authorize(&principal, Action::Read, &Resource::User(&user))?;
    Ok(Json(dto::to_json(&user)?))
}

/// Admin only; an admin can never delete their own account.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = load(&services, &id)?;
    services.policy.authorize_user_delete(&principal, &user)?;
    services.users.remove(&user.id)?;
    tracing::info!(user_id = %user.id, principal_id = %principal.id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}

fn load(services: &AppServices, raw_id: &str) -> Result<User, ApiError> {
    let id: UserId = dto::parse_id(raw_id)?;
    services.users.get(&id)?.ok_or_else(ApiError::not_found)
}
