//! Ownership policy for `{resource type × action}` pairs the role gate does not list.

use forgecrm_auth::Principal;
use forgecrm_config::Configuration;
use forgecrm_core::UserId;
use forgecrm_entities::{Customer, Lead, Task, Ticket, User};

use crate::gate::{Action, ResourceType};

/// Read-only snapshot of the resource a request targets.
///
/// Loaded by the handler before evaluation; the policy never mutates it.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Task(&'a Task),
    Ticket(&'a Ticket),
    Lead(&'a Lead),
    Customer(&'a Customer),
    User(&'a User),
    Configuration(&'a Configuration),
}

impl Resource<'_> {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            Resource::Task(_) => ResourceType::Task,
            Resource::Ticket(_) => ResourceType::Ticket,
            Resource::Lead(_) => ResourceType::Lead,
            Resource::Customer(_) => ResourceType::Customer,
            Resource::User(_) => ResourceType::User,
            Resource::Configuration(_) => ResourceType::Configuration,
        }
    }

    /// The user this resource belongs to, if it has an owner at all.
    pub fn owner(&self) -> Option<UserId> {
        match self {
            Resource::Task(task) => task.assigned_to,
            Resource::Ticket(ticket) => ticket.assigned_to,
            Resource::Lead(lead) => lead.assigned_to,
            Resource::Customer(customer) => customer.assigned_to,
            Resource::User(user) => Some(user.id),
            Resource::Configuration(_) => None,
        }
    }
}

/// Whether a non-gate match (assignee, owner, self) grants `action`.
///
/// Admins pass every ownership check. Configuration rows have no owner and are
/// readable by any principal; their mutations are gate-only.
pub fn is_owner_authorized(principal: &Principal, action: Action, snapshot: &Resource<'_>) -> bool {
    if principal.is_admin() {
        return true;
    }

    match (snapshot, action) {
        (Resource::Configuration(_), Action::Read) => true,
        (Resource::Configuration(_), _) => false,

        (Resource::Task(_), Action::Read | Action::Update | Action::UpdateStatus)
        | (Resource::Ticket(_), Action::Read | Action::Update | Action::UpdateStatus)
        | (Resource::Lead(_), Action::Read | Action::Update | Action::UpdateStatus | Action::Convert)
        | (Resource::Customer(_), Action::Read | Action::Update)
        | (Resource::User(_), Action::Read | Action::Update) => owned_by(principal, snapshot),

        // Proposed snapshots on create: the caller may only create for itself
        // or leave the record unassigned.
        (Resource::Task(_) | Resource::Lead(_) | Resource::Customer(_), Action::Create) => {
            snapshot.owner().is_none_or(|owner| principal.is(owner))
        }

        _ => false,
    }
}

fn owned_by(principal: &Principal, snapshot: &Resource<'_>) -> bool {
    snapshot.owner().is_some_and(|owner| principal.is(owner))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use forgecrm_auth::Role;
    use forgecrm_config::ConfigValue;
    use forgecrm_core::{LeadId, TaskId};

    fn task_for(assignee: Option<UserId>) -> Task {
        Task::new(TaskId::new(), "Call back", UserId::new(), assignee, Utc::now())
    }

    #[test]
    fn assignee_may_read_and_update_task() {
        let me = Principal::new(UserId::new(), Role::Sales);
        let task = task_for(Some(me.id));
        for action in [Action::Read, Action::Update, Action::UpdateStatus] {
            assert!(is_owner_authorized(&me, action, &Resource::Task(&task)));
        }
    }

    #[test]
    fn non_assignee_is_refused() {
        let me = Principal::new(UserId::new(), Role::Support);
        let theirs = task_for(Some(UserId::new()));
        let nobody = task_for(None);
        assert!(!is_owner_authorized(&me, Action::Read, &Resource::Task(&theirs)));
        assert!(!is_owner_authorized(&me, Action::Update, &Resource::Task(&nobody)));
    }

    #[test]
    fn admin_passes_ownership() {
        let admin = Principal::new(UserId::new(), Role::Admin);
        let task = task_for(Some(UserId::new()));
        assert!(is_owner_authorized(&admin, Action::Update, &Resource::Task(&task)));
    }

    #[test]
    fn leads_are_scoped_to_their_sales_owner() {
        let me = Principal::new(UserId::new(), Role::Sales);
        let mine = Lead::new(LeadId::new(), "Acme", Some(me.id), Utc::now());
        let theirs = Lead::new(LeadId::new(), "Globex", Some(UserId::new()), Utc::now());
        assert!(is_owner_authorized(&me, Action::Convert, &Resource::Lead(&mine)));
        assert!(!is_owner_authorized(&me, Action::Read, &Resource::Lead(&theirs)));
    }

    #[test]
    fn create_requires_self_or_unassigned() {
        let me = Principal::new(UserId::new(), Role::Sales);
        assert!(is_owner_authorized(&me, Action::Create, &Resource::Task(&task_for(Some(me.id)))));
        assert!(is_owner_authorized(&me, Action::Create, &Resource::Task(&task_for(None))));
        assert!(!is_owner_authorized(
            &me,
            Action::Create,
            &Resource::Task(&task_for(Some(UserId::new())))
        ));
    }

    #[test]
    fn users_may_read_themselves_only() {
        let me = Principal::new(UserId::new(), Role::Customer);
        let self_user = User::new(me.id, "me@example.com", "Me", Role::Customer, Utc::now());
        let other = User::new(UserId::new(), "x@example.com", "X", Role::Sales, Utc::now());
        assert!(is_owner_authorized(&me, Action::Read, &Resource::User(&self_user)));
        assert!(!is_owner_authorized(&me, Action::Read, &Resource::User(&other)));
        assert!(!is_owner_authorized(&me, Action::Delete, &Resource::User(&self_user)));
    }

    #[test]
    fn configuration_is_readable_but_not_writable_by_ownership() {
        let me = Principal::new(UserId::new(), Role::Support);
        let row = Configuration::new("ui.items_per_page", ConfigValue::Integer(25), Utc::now());
        assert!(is_owner_authorized(&me, Action::Read, &Resource::Configuration(&row)));
        assert!(!is_owner_authorized(&me, Action::Update, &Resource::Configuration(&row)));
    }
}
