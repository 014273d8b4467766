use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecrm_core::{DomainError, DomainResult, TaskId, UserId};

/// Task status lifecycle. `completed` and `cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// A terminal task accepts no further status changes.
    pub fn ensure_transition(self, next: TaskStatus) -> DomainResult<()> {
        if self.is_terminal() && next != self {
            return Err(DomainError::transition(self, next));
        }
        Ok(())
    }
}

impl core::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub assigned_to: Option<UserId>,
    pub created_by: UserId,
    pub status: TaskStatus,
    pub due_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        id: TaskId,
        title: impl Into<String>,
        created_by: UserId,
        assigned_to: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            assigned_to,
            created_by,
            status: TaskStatus::Pending,
            due_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, next: TaskStatus, now: DateTime<Utc>) -> DomainResult<()> {
        self.status.ensure_transition(next)?;
        self.status = next;
        self.updated_at = now;
        Ok(())
    }
}
