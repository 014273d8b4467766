use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;

use forgecrm_auth::Principal;
use forgecrm_core::TaskId;
use forgecrm_entities::Task;
use forgecrm_policy::{Action, Resource, TaskChange};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_task))
        .route("/:id", get(get_task).patch(update_task).delete(delete_task))
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = dto::non_empty("title", body.title)?;
    let mut task = Task::new(TaskId::new(), title, principal.id, body.assigned_to, Utc::now());
    task.due_at = body.due_at;

    services.policy.authorize_task_create(&principal, &task)?;

    services.tasks.upsert(task.id, task.clone())?;
    Ok((StatusCode::CREATED, Json(dto::to_json(&task)?)))
}

pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = load(&services, &id)?;
    services
        .policy
        .authorize(&principal, Action::Read, &Resource::Task(&task))?;
    Ok(Json(dto::to_json(&task)?))
}

pub async fn update_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut task = load(&services, &id)?;
    let change = TaskChange {
        assigned_to: body.assigned_to,
        status: body.status,
    };
    services.policy.authorize_task_update(&principal, &task, change)?;

    let now = Utc::now();
    if let Some(title) = body.title {
        task.title = dto::non_empty("title", title)?;
        task.updated_at = now;
    }
    if let Some(assignee) = body.assigned_to {
        task.assigned_to = Some(assignee);
        task.updated_at = now;
    }
    if let Some(status) = body.status {
        task.set_status(status, now)?;
    }

    services.tasks.upsert(task.id, task.clone())?;
    Ok(Json(dto::to_json(&task)?))
}

pub async fn delete_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = load(&services, &id)?;
    services.policy.authorize_task_delete(&principal, &task)?;
    services.tasks.remove(&task.id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn load(services: &AppServices, raw_id: &str) -> Result<Task, ApiError> {
    let id: TaskId = dto::parse_id(raw_id)?;
    services.tasks.get(&id)?.ok_or_else(ApiError::not_found)
}
