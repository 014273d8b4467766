use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use forgecrm_auth::Principal;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<Principal>) -> impl IntoResponse {
    Json(serde_json::json!({
        "user_id": principal.id.to_string(),
        "role": principal.role.as_str(),
    }))
}
