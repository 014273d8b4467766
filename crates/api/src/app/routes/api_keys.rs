//! Self-service API key lifecycle. Keys are always issued for the caller,
//! with the caller's role.

use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use forgecrm_auth::{issue_api_key, ApiKeyId, Principal};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_keys).post(create_key))
        .route("/:id", delete(revoke_key))
}

/// The plaintext key appears in this response only.
pub async fn create_key(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::IssueApiKeyRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let label = dto::non_empty("label", body.label)?;
    let issued = issue_api_key(
        services.api_keys.as_ref(),
        principal.id,
        principal.role,
        label,
        body.expires_at,
        Utc::now(),
    )
    .await?;

    let mut payload = dto::api_key_to_json(&issued.record);
    payload["key"] = json!(issued.plaintext);
    Ok((StatusCode::CREATED, Json(payload)))
}

pub async fn list_keys(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
) -> Result<impl IntoResponse, ApiError> {
    let items = services
        .api_keys
        .list_for_user(principal.id)
        .await?
        .iter()
        .map(dto::api_key_to_json)
        .collect::<Vec<_>>();
    Ok(Json(json!({ "items": items })))
}

pub async fn revoke_key(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id: ApiKeyId = dto::parse_id(&id)?;
    let owned = services
        .api_keys
        .list_for_user(principal.id)
        .await?
        .iter()
        .any(|record| record.id == id);
    if !owned {
        return Err(ApiError::not_found());
    }

    let record = services.api_keys.revoke(id, Utc::now()).await?;
    tracing::info!(key_id = %record.id, "api key revoked");
    Ok(Json(dto::api_key_to_json(&record)))
}
