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
use forgecrm_config::{ConfigStore, TICKETS_DEFAULT_PRIORITY};
use forgecrm_core::TicketId;
use forgecrm_entities::Ticket;
use forgecrm_policy::{Action, Resource, TicketChange};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_ticket))
        .route("/:id", get(get_ticket).patch(update_ticket).delete(delete_ticket))
}

pub async fn create_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::CreateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    services.policy.authorize_ticket_create(&principal)?;

    let subject = dto::non_empty("subject", body.subject)?;
    let priority = match body.priority {
        Some(priority) => validated_priority(&services.config, priority).await?,
        None => default_priority(&services.config).await?,
    };
    let ticket = Ticket::new(TicketId::new(), subject, body.assigned_to, priority, Utc::now());

    services.tickets.upsert(ticket.id, ticket.clone())?;
    Ok((StatusCode::CREATED, Json(dto::to_json(&ticket)?)))
}

pub async fn get_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = load(&services, &id)?;
    services
        .policy
        .authorize(&principal, Action::Read, &Resource::Ticket(&ticket))?;
    Ok(Json(dto::to_json(&ticket)?))
}

pub async fn update_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateTicketRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut ticket = load(&services, &id)?;
    services
        .policy
        .authorize_ticket_update(&principal, &ticket, TicketChange { status: body.status })?;

    let now = Utc::now();
    if let Some(subject) = body.subject {
        ticket.subject = dto::non_empty("subject", subject)?;
        ticket.updated_at = now;
    }
    if let Some(priority) = body.priority {
        ticket.priority = validated_priority(&services.config, priority).await?;
        ticket.updated_at = now;
    }
    if let Some(status) = body.status {
        ticket.set_status(status, now)?;
    }

    services.tickets.upsert(ticket.id, ticket.clone())?;
    Ok(Json(dto::to_json(&ticket)?))
}

pub async fn delete_ticket(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ticket = load(&services, &id)?;
    services.policy.authorize_ticket_delete(&principal, &ticket)?;
    services.tickets.remove(&ticket.id)?;
    Ok(StatusCode::NO_CONTENT)
}

fn load(services: &AppServices, raw_id: &str) -> Result<Ticket, ApiError> {
    let id: TicketId = dto::parse_id(raw_id)?;
    services.tickets.get(&id)?.ok_or_else(ApiError::not_found)
}

async fn default_priority(config: &ConfigStore) -> Result<String, ApiError> {
    let value = config.get_value(TICKETS_DEFAULT_PRIORITY).await?;
    Ok(value.as_str().unwrap_or("medium").to_string())
}

/// Priorities are constrained by the valid values of the default-priority row.
async fn validated_priority(config: &ConfigStore, priority: String) -> Result<String, ApiError> {
    let row = config.get_by_key(TICKETS_DEFAULT_PRIORITY).await?;
    let candidate = row
        .value_type
        .coerce(&serde_json::Value::String(priority))
        .map_err(|_| ApiError::bad_request("unknown ticket priority"))?;
    row.ensure_allowed(&candidate)
        .map_err(|_| ApiError::bad_request("unknown ticket priority"))?;
    Ok(candidate.encode())
}
