//! `forgecrm-policy`: per-request authorization decisions.
//!
//! A decision combines three sources, in order:
//! 1. the static [role gate](gate) for `{resource type × action}`,
//! 2. the [ownership policy](ownership) for pairs the gate does not list,
//! 3. configuration-driven business rules ([`LeadConversionRule`]).
//!
//! Nothing here performs I/O except the configuration read behind the
//! conversion rule.

pub mod decision;
pub mod engine;
pub mod error;
pub mod gate;
pub mod ownership;
pub mod rules;

pub use decision::{DecisionReason, PolicyDecision};
pub use engine::{PolicyEngine, TaskChange, TicketChange};
pub use error::AuthzError;
pub use gate::{gate_entry, is_role_allowed, Action, GateEntry, ResourceType, ROLE_GATE};
pub use ownership::{is_owner_authorized, Resource};
pub use rules::LeadConversionRule;
