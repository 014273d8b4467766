use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecrm_core::{CustomerId, DomainError, DomainResult, TicketId, UserId};

/// Support ticket status, ordered from earliest to latest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Open => "open",
            TicketStatus::InProgress => "in_progress",
            TicketStatus::Resolved => "resolved",
            TicketStatus::Closed => "closed",
        }
    }

    /// A closed ticket cannot be reopened to an earlier status.
    pub fn ensure_transition(self, next: TicketStatus) -> DomainResult<()> {
        if self == TicketStatus::Closed && next < self {
            return Err(DomainError::transition(self, next));
        }
        Ok(())
    }
}

impl core::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ticket snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub subject: String,
    pub customer_id: Option<CustomerId>,
    /// Support agent currently handling the ticket.
    pub assigned_to: Option<UserId>,
    pub status: TicketStatus,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        id: TicketId,
        subject: impl Into<String>,
        assigned_to: Option<UserId>,
        priority: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            subject: subject.into(),
            customer_id: None,
            assigned_to,
            status: TicketStatus::Open,
            priority: priority.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, next: TicketStatus, now: DateTime<Utc>) -> DomainResult<()> {
        self.status.ensure_transition(next)?;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
