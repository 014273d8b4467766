use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use forgecrm_auth::ApiKeyRecord;
use forgecrm_config::{ConfigStore, Configuration};
use forgecrm_core::UserId;
use forgecrm_entities::{LeadStatus, TaskStatus, TicketStatus};

use crate::app::errors::ApiError;

// ─────────────────────────────────────────────────────────────────────────────
// Request DTOs
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SetConfigRequest {
    pub value: JsonValue,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    pub assigned_to: Option<UserId>,
    pub due_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub assigned_to: Option<UserId>,
    pub status: Option<TaskStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTicketRequest {
    pub subject: String,
    pub assigned_to: Option<UserId>,
    pub priority: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateTicketRequest {
    pub subject: Option<String>,
    pub priority: Option<String>,
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub name: String,
    pub email: Option<String>,
    pub assigned_to: Option<UserId>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLeadRequest {
    pub status: LeadStatus,
}

#[derive(Debug, Deserialize)]
pub struct IssueApiKeyRequest {
    pub label: String,
    pub expires_at: Option<DateTime<Utc>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Response mapping
// ─────────────────────────────────────────────────────────────────────────────

pub fn config_to_json(config: &Configuration) -> JsonValue {
    json!({
        "key": config.key,
        "value": ConfigStore::typed_value(config),
        "type": config.value_type,
        "category": config.category,
        "description": config.description,
        "default_value": config.typed_default(),
        "is_system": config.is_system,
        "is_read_only": config.is_read_only,
        "valid_values": config.valid_values.as_ref().map(|_| config.allowed_values()),
        "updated_at": config.updated_at,
    })
}

pub fn api_key_to_json(record: &ApiKeyRecord) -> JsonValue {
    json!({
        "id": record.id,
        "label": record.label,
        "role": record.role,
        "created_at": record.created_at,
        "expires_at": record.expires_at,
        "revoked_at": record.revoked_at,
    })
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<JsonValue, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Authz(forgecrm_policy::AuthzError::internal(e.to_string())))
}

/// Parse a path id, answering 404 for anything that is not a valid id.
pub fn parse_id<T: core::str::FromStr>(raw: &str) -> Result<T, ApiError> {
    raw.parse::<T>().map_err(|_| ApiError::not_found())
}

pub fn non_empty(field: &'static str, value: String) -> Result<String, ApiError> {
    let value = value.trim().to_string();
    if value.is_empty() {
        return Err(ApiError::bad_request(format!("{field} cannot be empty")));
    }
    Ok(value)
}
