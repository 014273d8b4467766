//! `forgecrm-observability`: process-wide tracing setup.

pub mod tracing;

pub use crate::tracing::LogFormat;

/// Initialize tracing from the environment (`RUST_LOG`, `FORGECRM_LOG_FORMAT`).
///
/// Safe to call multiple times; later calls are no-ops.
pub fn init() {
    tracing::init(LogFormat::from_env());
}
