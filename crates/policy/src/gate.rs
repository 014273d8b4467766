//! Role gate: `{resource type × action}` → roles allowed unconditionally.
//!
//! A listed pair admits exactly its roles and denies all others. An unlisted
//! pair is neither granted nor denied here; it falls through to the
//! [ownership policy](crate::ownership).

use serde::{Deserialize, Serialize};

use forgecrm_auth::Role;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    User,
    Task,
    Ticket,
    Lead,
    Customer,
    Configuration,
}

impl ResourceType {
    pub const ALL: [ResourceType; 6] = [
        ResourceType::User,
        ResourceType::Task,
        ResourceType::Ticket,
        ResourceType::Lead,
        ResourceType::Customer,
        ResourceType::Configuration,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::User => "user",
            ResourceType::Task => "task",
            ResourceType::Ticket => "ticket",
            ResourceType::Lead => "lead",
            ResourceType::Customer => "customer",
            ResourceType::Configuration => "configuration",
        }
    }
}

impl core::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Read,
    ListAll,
    Create,
    Update,
    UpdateStatus,
    Delete,
    /// Set a task's assignee to someone other than the caller.
    Reassign,
    Convert,
    Reset,
}

impl Action {
    pub const ALL: [Action; 9] = [
        Action::Read,
        Action::ListAll,
        Action::Create,
        Action::Update,
        Action::UpdateStatus,
        Action::Delete,
        Action::Reassign,
        Action::Convert,
        Action::Reset,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::ListAll => "list_all",
            Action::Create => "create",
            Action::Update => "update",
            Action::UpdateStatus => "update_status",
            Action::Delete => "delete",
            Action::Reassign => "reassign",
            Action::Convert => "convert",
            Action::Reset => "reset",
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GateEntry {
    pub resource: ResourceType,
    pub action: Action,
    pub roles: &'static [Role],
}

impl GateEntry {
    pub fn admits(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

const ADMIN_ONLY: &[Role] = &[Role::Admin];

/// The authoritative table.
pub static ROLE_GATE: &[GateEntry] = &[
    GateEntry { resource: ResourceType::User, action: Action::Delete, roles: ADMIN_ONLY },
    GateEntry { resource: ResourceType::User, action: Action::ListAll, roles: ADMIN_ONLY },
    GateEntry { resource: ResourceType::Task, action: Action::Delete, roles: ADMIN_ONLY },
    GateEntry { resource: ResourceType::Task, action: Action::Reassign, roles: ADMIN_ONLY },
    GateEntry { resource: ResourceType::Ticket, action: Action::Create, roles: &[Role::Admin, Role::Support] },
    GateEntry { resource: ResourceType::Ticket, action: Action::Delete, roles: ADMIN_ONLY },
    GateEntry { resource: ResourceType::Configuration, action: Action::ListAll, roles: ADMIN_ONLY },
    GateEntry { resource: ResourceType::Configuration, action: Action::Update, roles: ADMIN_ONLY },
    GateEntry { resource: ResourceType::Configuration, action: Action::Reset, roles: ADMIN_ONLY },
];

/// Table row for `(resource, action)`, if the pair is listed.
pub fn gate_entry(resource: ResourceType, action: Action) -> Option<&'static GateEntry> {
    ROLE_GATE
        .iter()
        .find(|entry| entry.resource == resource && entry.action == action)
}

/// Whether `role` is unconditionally allowed `action` on `resource`.
///
/// False for unlisted pairs: those are decided by ownership, not by role.
pub fn is_role_allowed(resource: ResourceType, action: Action, role: Role) -> bool {
    gate_entry(resource, action).is_some_and(|entry| entry.admits(role))
}
