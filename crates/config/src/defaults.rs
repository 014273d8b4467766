//! Built-in configuration catalogue, seeded at startup via
//! [`ConfigStore::ensure_defaults`](crate::ConfigStore::ensure_defaults).

use chrono::{DateTime, Utc};
use serde_json::json;

use crate::model::Configuration;
use crate::value::ConfigValue;

/// Lead statuses from which conversion to a customer is permitted.
pub const LEAD_CONVERSION_ALLOWED_STATUSES: &str = "leads.conversion.allowed_statuses";

/// Whether `ApiKey` credentials are accepted.
pub const API_KEYS_ENABLED: &str = "auth.api_keys.enabled";

/// Default priority for new tickets.
pub const TICKETS_DEFAULT_PRIORITY: &str = "tickets.default_priority";

/// Category whose rows are safe to show to any authenticated principal.
pub const UI_CATEGORY: &str = "ui";

/// Default rows shipped with the application.
pub fn system_defaults(now: DateTime<Utc>) -> Vec<Configuration> {
    vec![
        // Leads
        Configuration::new(
            LEAD_CONVERSION_ALLOWED_STATUSES,
            ConfigValue::Array(vec![json!("qualified")]),
            now,
        )
        .category("leads")
        .description("Lead statuses from which a lead may be converted to a customer")
        .system()
        .valid_values(vec![json!("new"), json!("contacted"), json!("qualified")]),
        Configuration::new("leads.default_status", ConfigValue::String("new".into()), now)
            .category("leads")
            .description("Status assigned to newly created leads")
            .system()
            .valid_values(vec![json!("new"), json!("contacted"), json!("qualified")]),
        Configuration::new("leads.scoring.qualification_threshold", ConfigValue::Float(0.6), now)
            .category("leads")
            .description("Minimum lead score suggested for qualification"),
        // Tickets
        Configuration::new(TICKETS_DEFAULT_PRIORITY, ConfigValue::String("medium".into()), now)
            .category("tickets")
            .description("Priority assigned to new tickets")
            .system()
            .valid_values(vec![json!("low"), json!("medium"), json!("high"), json!("urgent")]),
        Configuration::new("tickets.auto_close_days", ConfigValue::Integer(14), now)
            .category("tickets")
            .description("Days after resolution before a ticket is closed automatically"),
        // Tasks
        Configuration::new("tasks.default_priority", ConfigValue::String("medium".into()), now)
            .category("tasks")
            .description("Priority assigned to new tasks")
            .valid_values(vec![json!("low"), json!("medium"), json!("high")]),
        // Authentication
        Configuration::new(API_KEYS_ENABLED, ConfigValue::Boolean(true), now)
            .category("security")
            .description("Whether API keys are accepted as credentials")
            .system(),
        // UI
        Configuration::new("ui.theme.primary_color", ConfigValue::String("#1976d2".into()), now)
            .category(UI_CATEGORY)
            .description("Primary brand color of the admin UI"),
        Configuration::new("ui.items_per_page", ConfigValue::Integer(25), now)
            .category(UI_CATEGORY)
            .description("Default page size for list views")
            .valid_values(vec![json!(10), json!(25), json!(50), json!(100)]),
        Configuration::new(
            "ui.features",
            ConfigValue::Json(json!({ "customer_portal": false, "kanban_board": true })),
            now,
        )
        .category(UI_CATEGORY)
        .description("Client feature toggles"),
        // System
        Configuration::new("system.version", ConfigValue::String(env!("CARGO_PKG_VERSION").into()), now)
            .category("system")
            .description("Schema version of the configuration catalogue")
            .system()
            .read_only(),
    ]
}
