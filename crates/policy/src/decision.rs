use serde::Serialize;

use crate::error::AuthzError;

/// Machine-readable reason attached to every decision. Logged, never sent to clients.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    RoleGranted,
    OwnerMatch,
    RoleDenied,
    NotOwner,
    SelfProtection,
    ReassignNotPermitted,
    MissingResource,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionReason::RoleGranted => "role_granted",
            DecisionReason::OwnerMatch => "owner_match",
            DecisionReason::RoleDenied => "role_denied",
            DecisionReason::NotOwner => "not_owner",
            DecisionReason::SelfProtection => "self_protection",
            DecisionReason::ReassignNotPermitted => "reassign_not_permitted",
            DecisionReason::MissingResource => "missing_resource",
        }
    }
}

impl core::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one policy evaluation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize)]
pub struct PolicyDecision {
    pub allowed: bool,
    pub reason: DecisionReason,
}

impl PolicyDecision {
    pub fn allow(reason: DecisionReason) -> Self {
        Self { allowed: true, reason }
    }

    pub fn deny(reason: DecisionReason) -> Self {
        Self { allowed: false, reason }
    }

    /// `Ok(())` when allowed, otherwise [`AuthzError::Forbidden`].
    pub fn into_result(self) -> Result<(), AuthzError> {
        if self.allowed {
            Ok(())
        } else {
            Err(AuthzError::Forbidden)
        }
    }
}
