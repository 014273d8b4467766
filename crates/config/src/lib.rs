//! `forgecrm-config`: runtime-editable, typed configuration store.
//!
//! Every setting is stored as text behind a type tag. All encoding, decoding
//! and coercion goes through [`ConfigType`] / [`ConfigValue`] so callers share
//! one set of conversion rules and one malformed-data policy.

pub mod defaults;
pub mod error;
pub mod model;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repository;
pub mod store;
pub mod value;

pub use defaults::{
    system_defaults, API_KEYS_ENABLED, LEAD_CONVERSION_ALLOWED_STATUSES, TICKETS_DEFAULT_PRIORITY, UI_CATEGORY,
};
pub use error::ConfigError;
pub use model::Configuration;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConfigRepository;
pub use repository::{ConfigRepository, InMemoryConfigRepository, ValueMutation};
pub use store::ConfigStore;
pub use value::{ConfigType, ConfigValue, ValueError};
