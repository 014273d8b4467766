//! Configuration-driven business rules.

use forgecrm_config::{ConfigError, ConfigStore, LEAD_CONVERSION_ALLOWED_STATUSES};
use forgecrm_entities::{Lead, LeadStatus};

use crate::error::AuthzError;

/// Which lead statuses may be converted to a customer.
///
/// The list is re-read from the configuration store on every call, so an
/// admin change applies to the next request without a restart.
#[derive(Debug, Clone)]
pub struct LeadConversionRule {
    config: ConfigStore,
}

impl LeadConversionRule {
    pub fn new(config: ConfigStore) -> Self {
        Self { config }
    }

    /// Currently configured source statuses. Unknown entries are skipped.
    pub async fn allowed_statuses(&self) -> Result<Vec<LeadStatus>, AuthzError> {
        let raw = self
            .config
            .get_string_list(LEAD_CONVERSION_ALLOWED_STATUSES)
            .await
            .map_err(|e| match e {
                ConfigError::NotFound(key) => {
                    tracing::error!(key = %key, "lead conversion rule is not configured");
                    AuthzError::internal(format!("missing configuration '{key}'"))
                }
                other => AuthzError::from(other),
            })?;

        Ok(raw
            .iter()
            .filter_map(|s| match s.parse::<LeadStatus>() {
                Ok(status) => Some(status),
                Err(_) => {
                    tracing::warn!(status = %s, "ignoring unknown lead status in conversion rule");
                    None
                }
            })
            .collect())
    }

    pub async fn is_lead_convertible(&self, status: LeadStatus) -> Result<bool, AuthzError> {
        Ok(!status.is_terminal() && self.allowed_statuses().await?.contains(&status))
    }

    /// Fails with `InvalidStateTransition` unless `lead` may be converted now.
    ///
    /// Returns the list the decision was made against so the caller converts
    /// under the same rule.
    pub async fn ensure_convertible(&self, lead: &Lead) -> Result<Vec<LeadStatus>, AuthzError> {
        let allowed = self.allowed_statuses().await?;
        if !lead.is_convertible(&allowed) {
            tracing::debug!(lead_id = %lead.id, status = %lead.status, "lead not convertible");
            return Err(AuthzError::InvalidStateTransition(format!(
                "lead in status '{}' cannot be converted",
                lead.status
            )));
        }
        Ok(allowed)
    }
}
