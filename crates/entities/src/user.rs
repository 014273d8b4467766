use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecrm_auth::Role;
use forgecrm_core::UserId;

/// User account snapshot.
///
/// `role` is the same [`Role`] the principal resolver produces, so ownership
/// and gate checks never compare against a re-derived representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        id: UserId,
        email: impl Into<String>,
        display_name: impl Into<String>,
        role: Role,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            email: email.into().trim().to_lowercase(),
            display_name: display_name.into().trim().to_string(),
            role,
            active: true,
            created_at: now,
        }
    }
}
