use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecrm_core::{CustomerId, LeadId, UserId};

/// Customer snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: Option<String>,
    /// Account owner.
    pub assigned_to: Option<UserId>,
    /// Lead this customer was converted from, if any.
    pub converted_from: Option<LeadId>,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    /// Build the customer record produced by converting `lead`.
    pub fn from_lead(id: CustomerId, lead: &crate::Lead, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: lead.name.clone(),
            email: lead.email.clone(),
            assigned_to: lead.assigned_to,
            converted_from: Some(lead.id),
            created_at: now,
        }
    }
}
