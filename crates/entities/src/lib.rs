//! `forgecrm-entities`: CRM resource snapshots and their status lifecycles.
//!
//! Persistence of these records belongs to the storage layer; this crate only
//! describes their shape and the state machines the policy layer enforces.

pub mod customer;
pub mod lead;
pub mod task;
pub mod ticket;
pub mod user;

pub use customer::Customer;
pub use lead::{Lead, LeadStatus};
pub use task::{Task, TaskStatus};
pub use ticket::{Ticket, TicketStatus};
pub use user::User;
