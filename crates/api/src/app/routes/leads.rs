use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use forgecrm_auth::Principal;
use forgecrm_core::{CustomerId, LeadId};
use forgecrm_entities::{Customer, Lead};
use forgecrm_policy::{Action, Resource};

use crate::app::dto;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_lead))
        .route("/:id", get(get_lead).patch(update_lead))
        .route("/:id/convert", post(convert_lead))
}

pub async fn create_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Json(body): Json<dto::CreateLeadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let name = dto::non_empty("name", body.name)?;
    let mut lead = Lead::new(LeadId::new(), name, body.assigned_to, Utc::now());
    lead.email = body.email.map(|e| e.trim().to_lowercase()).filter(|e| !e.is_empty());

    services
        .policy
        .authorize(&principal, Action::Create, &Resource::Lead(&lead))?;

    services.leads.upsert(lead.id, lead.clone())?;
    Ok((StatusCode::CREATED, Json(dto::to_json(&lead)?)))
}

pub async fn get_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let lead = load(&services, &id)?;
    services
        .policy
        .authorize(&principal, Action::Read, &Resource::Lead(&lead))?;
    Ok(Json(dto::to_json(&lead)?))
}

/// Move a lead along the fixed part of its lifecycle.
pub async fn update_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    Json(body): Json<dto::UpdateLeadRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut lead = load(&services, &id)?;
    services
        .policy
        .authorize(&principal, Action::UpdateStatus, &Resource::Lead(&lead))?;

    lead.transition(body.status, Utc::now())?;
    services.leads.upsert(lead.id, lead.clone())?;
    Ok(Json(dto::to_json(&lead)?))
}

/// Convert a lead into a customer, subject to the configured source statuses.
pub async fn convert_lead(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let mut lead = load(&services, &id)?;
    let allowed = services
        .policy
        .authorize_lead_conversion(&principal, &lead)
        .await?;

    let now = Utc::now();
    let customer = Customer::from_lead(CustomerId::new(), &lead, now);
    lead.convert(&allowed, customer.id, now)?;

    services.customers.upsert(customer.id, customer.clone())?;
    services.leads.upsert(lead.id, lead.clone())?;
    tracing::info!(lead_id = %lead.id, customer_id = %customer.id, "lead converted");

    Ok(Json(json!({
        "lead": dto::to_json(&lead)?,
        "customer": dto::to_json(&customer)?,
    })))
}

fn load(services: &AppServices, raw_id: &str) -> Result<Lead, ApiError> {
    let id: LeadId = dto::parse_id(raw_id)?;
    services.leads.get(&id)?.ok_or_else(ApiError::not_found)
}
