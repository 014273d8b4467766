use serde::{Deserialize, Serialize};

use forgecrm_core::UserId;

use crate::Role;

/// The authenticated identity making a request.
///
/// Built once per request by the [`PrincipalResolver`](crate::PrincipalResolver)
/// and never persisted.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Owner key compared against `assigned_to` / user ids.
    pub id: UserId,
    pub role: Role,
}

impl Principal {
    pub fn new(id: UserId, role: Role) -> Self {
        Self { id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Whether this principal is the user `id`.
    pub fn is(&self, id: UserId) -> bool {
        self.id == id
    }
}
