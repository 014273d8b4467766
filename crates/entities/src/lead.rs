use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecrm_core::{CustomerId, DomainError, DomainResult, LeadId, UserId};

/// Lead qualification lifecycle.
///
/// `new → contacted → qualified → (converted | unqualified)`. Which statuses
/// may move to `converted` is not fixed here: callers pass the set that is
/// currently configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Converted,
    Unqualified,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 5] = [
        LeadStatus::New,
        LeadStatus::Contacted,
        LeadStatus::Qualified,
        LeadStatus::Converted,
        LeadStatus::Unqualified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::New => "new",
            LeadStatus::Contacted => "contacted",
            LeadStatus::Qualified => "qualified",
            LeadStatus::Converted => "converted",
            LeadStatus::Unqualified => "unqualified",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, LeadStatus::Converted | LeadStatus::Unqualified)
    }

    /// Fixed (non-conversion) transitions.
    ///
    /// Any open lead may be disqualified; conversion goes through
    /// [`Lead::convert`] instead.
    pub fn can_transition_to(self, next: LeadStatus) -> bool {
        match (self, next) {
            (LeadStatus::New, LeadStatus::Contacted) => true,
            (LeadStatus::Contacted, LeadStatus::Qualified) => true,
            (from, LeadStatus::Unqualified) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl core::fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| DomainError::validation(format!("unknown lead status '{s}'")))
    }
}

/// Lead snapshot as seen by the policy layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: LeadId,
    pub name: String,
    pub email: Option<String>,
    /// Sales owner of the lead.
    pub assigned_to: Option<UserId>,
    pub status: LeadStatus,
    /// Set once the lead has been converted.
    pub customer_id: Option<CustomerId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(id: LeadId, name: impl Into<String>, assigned_to: Option<UserId>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            email: None,
            assigned_to,
            status: LeadStatus::New,
            customer_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move along the fixed part of the lifecycle.
    pub fn transition(&mut self, next: LeadStatus, now: DateTime<Utc>) -> DomainResult<()> {
        if next == LeadStatus::Converted || !self.status.can_transition_to(next) {
            return Err(DomainError::transition(self.status, next));
        }
        self.status = next;
        self.updated_at = now;
        Ok(())
    }

    /// Whether the lead may be converted given the configured source statuses.
    ///
    /// Terminal leads are never convertible, whatever the configuration says.
    pub fn is_convertible(&self, convertible_from: &[LeadStatus]) -> bool {
        !self.status.is_terminal() && convertible_from.contains(&self.status)
    }

    /// Convert the lead into a customer.
    pub fn convert(
        &mut self,
        convertible_from: &[LeadStatus],
        customer_id: CustomerId,
        now: DateTime<Utc>,
    ) -> DomainResult<()> {
        if !self.is_convertible(convertible_from) {
            return Err(DomainError::transition(self.status, LeadStatus::Converted));
        }
        self.status = LeadStatus::Converted;
        self.customer_id = Some(customer_id);
        self.updated_at = now;
        Ok(())
    }
}
