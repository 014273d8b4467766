//! HTTP API: reference surface over the policy engine and configuration store.

pub mod app;
pub mod middleware;
pub mod settings;
