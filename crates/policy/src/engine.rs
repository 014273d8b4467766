//! Policy evaluation entry point used by request handlers.

use forgecrm_auth::Principal;
use forgecrm_config::ConfigStore;
use forgecrm_core::UserId;
use forgecrm_entities::{Lead, LeadStatus, Task, TaskStatus, Ticket, TicketStatus, User};

use crate::decision::{DecisionReason, PolicyDecision};
use crate::error::AuthzError;
use crate::gate::{gate_entry, is_role_allowed, Action, ResourceType};
use crate::ownership::{is_owner_authorized, Resource};
use crate::rules::LeadConversionRule;

/// Requested changes to an existing task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskChange {
    /// New assignee, if the assignee changes.
    pub assigned_to: Option<UserId>,
    pub status: Option<TaskStatus>,
}

/// Requested changes to an existing ticket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TicketChange {
    pub status: Option<TicketStatus>,
}

/// Combines the role gate, the ownership policy and configuration-driven rules.
///
/// Cheap to clone. Every `authorize_*` method returns before any mutation is
/// attempted; handlers call it after loading the target resource.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    conversion: LeadConversionRule,
}

impl PolicyEngine {
    pub fn new(config: ConfigStore) -> Self {
        Self {
            conversion: LeadConversionRule::new(config),
        }
    }

    /// Evaluate one `(principal, resource type, action, snapshot)` tuple.
    ///
    /// 1. A listed gate pair decides by role alone, except that deleting one's
    ///    own user account is always refused. A user delete without a
    ///    snapshot is refused too, since the target cannot be checked.
    /// 2. An unlisted pair is decided by the ownership policy on `snapshot`.
    pub fn evaluate(
        &self,
        principal: &Principal,
        resource: ResourceType,
        action: Action,
        snapshot: Option<&Resource<'_>>,
    ) -> PolicyDecision {
        let decision = match gate_entry(resource, action) {
            Some(entry) if entry.admits(principal.role) => {
                if needs_target(resource, action) && snapshot.is_none() {
                    PolicyDecision::deny(DecisionReason::MissingResource)
                } else if is_self_delete(principal, action, snapshot) {
                    PolicyDecision::deny(DecisionReason::SelfProtection)
                } else {
                    PolicyDecision::allow(DecisionReason::RoleGranted)
                }
            }
            Some(_) => PolicyDecision::deny(DecisionReason::RoleDenied),
            None => match snapshot {
                Some(snapshot) if snapshot.resource_type() == resource => {
                    if is_owner_authorized(principal, action, snapshot) {
                        PolicyDecision::allow(DecisionReason::OwnerMatch)
                    } else {
                        PolicyDecision::deny(DecisionReason::NotOwner)
                    }
                }
                Some(snapshot) => {
                    tracing::warn!(
                        expected = %resource,
                        actual = %snapshot.resource_type(),
                        "policy snapshot does not match resource type"
                    );
                    PolicyDecision::deny(DecisionReason::MissingResource)
                }
                None if principal.is_admin() => PolicyDecision::allow(DecisionReason::RoleGranted),
                None => PolicyDecision::deny(DecisionReason::MissingResource),
            },
        };

        log_decision(principal, resource, action, decision);
        decision
    }

    /// Authorize `action` on a loaded resource.
    pub fn authorize(&self, principal: &Principal, action: Action, snapshot: &Resource<'_>) -> Result<(), AuthzError> {
        self.evaluate(principal, snapshot.resource_type(), action, Some(snapshot))
            .into_result()
    }

    /// Authorize an action that has no target snapshot (collection-level actions).
    pub fn authorize_action(
        &self,
        principal: &Principal,
        resource: ResourceType,
        action: Action,
    ) -> Result<(), AuthzError> {
        self.evaluate(principal, resource, action, None).into_result()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tasks
    // ─────────────────────────────────────────────────────────────────────

    /// Creating a task for someone else needs the reassign grant; creating
    /// it for oneself or unassigned does not.
    pub fn authorize_task_create(&self, principal: &Principal, proposed: &Task) -> Result<(), AuthzError> {
        match proposed.assigned_to {
            Some(assignee) => self.ensure_may_assign(principal, assignee),
            None => Ok(()),
        }
    }

    /// Ownership first, then reassignment, then the status state machine.
    pub fn authorize_task_update(
        &self,
        principal: &Principal,
        task: &Task,
        change: TaskChange,
    ) -> Result<(), AuthzError> {
        let action = if change.status.is_some() {
            Action::UpdateStatus
        } else {
            Action::Update
        };
        self.authorize(principal, action, &Resource::Task(task))?;

        if let Some(assignee) = change.assigned_to {
            self.ensure_may_assign(principal, assignee)?;
        }
        if let Some(next) = change.status {
            task.status.ensure_transition(next)?;
        }
        Ok(())
    }

    pub fn authorize_task_delete(&self, principal: &Principal, task: &Task) -> Result<(), AuthzError> {
        self.authorize(principal, Action::Delete, &Resource::Task(task))
    }

    fn ensure_may_assign(&self, principal: &Principal, assignee: UserId) -> Result<(), AuthzError> {
        if principal.is(assignee) || is_role_allowed(ResourceType::Task, Action::Reassign, principal.role) {
            return Ok(());
        }
        log_decision(
            principal,
            ResourceType::Task,
            Action::Reassign,
            PolicyDecision::deny(DecisionReason::ReassignNotPermitted),
        );
        Err(AuthzError::Forbidden)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tickets
    // ─────────────────────────────────────────────────────────────────────

    pub fn authorize_ticket_create(&self, principal: &Principal) -> Result<(), AuthzError> {
        self.authorize_action(principal, ResourceType::Ticket, Action::Create)
    }

    pub fn authorize_ticket_update(
        &self,
        principal: &Principal,
        ticket: &Ticket,
        change: TicketChange,
    ) -> Result<(), AuthzError> {
        let action = if change.status.is_some() {
            Action::UpdateStatus
        } else {
            Action::Update
        };
        self.authorize(principal, action, &Resource::Ticket(ticket))?;

        if let Some(next) = change.status {
            ticket.status.ensure_transition(next)?;
        }
        Ok(())
    }

    pub fn authorize_ticket_delete(&self, principal: &Principal, ticket: &Ticket) -> Result<(), AuthzError> {
        self.authorize(principal, Action::Delete, &Resource::Ticket(ticket))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Users
    // ─────────────────────────────────────────────────────────────────────

    pub fn authorize_user_list(&self, principal: &Principal) -> Result<(), AuthzError> {
        self.authorize_action(principal, ResourceType::User, Action::ListAll)
    }

    /// Admin only, and never one's own account.
    pub fn authorize_user_delete(&self, principal: &Principal, target: &User) -> Result<(), AuthzError> {
        self.authorize(principal, Action::Delete, &Resource::User(target))
    }

    // ─────────────────────────────────────────────────────────────────────
    // Leads
    // ─────────────────────────────────────────────────────────────────────

    /// Owner (or admin) check, then the configured conversion rule.
    ///
    /// Returns the statuses the decision used; pass them to [`Lead::convert`].
    pub async fn authorize_lead_conversion(
        &self,
        principal: &Principal,
        lead: &Lead,
    ) -> Result<Vec<LeadStatus>, AuthzError> {
        self.authorize(principal, Action::Convert, &Resource::Lead(lead))?;
        self.conversion.ensure_convertible(lead).await
    }
}

/// Gate rows whose grant still depends on the target.
fn needs_target(resource: ResourceType, action: Action) -> bool {
    resource == ResourceType::User && action == Action::Delete
}

fn is_self_delete(principal: &Principal, action: Action, snapshot: Option<&Resource<'_>>) -> bool {
    action == Action::Delete && matches!(snapshot, Some(Resource::User(user)) if principal.is(user.id))
}

fn log_decision(principal: &Principal, resource: ResourceType, action: Action, decision: PolicyDecision) {
    if decision.allowed {
        tracing::trace!(
            principal_id = %principal.id,
            role = %principal.role,
            resource = %resource,
            action = %action,
            reason = %decision.reason,
            "access granted"
        );
    } else {
        tracing::debug!(
            principal_id = %principal.id,
            role = %principal.role,
            resource = %resource,
            action = %action,
            reason = %decision.reason,
            "access denied"
        );
    }
}
