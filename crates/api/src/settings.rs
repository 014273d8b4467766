//! Process settings read once from the environment.
//!
//! Business settings live in the configuration store, not here.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 60;
const DEV_JWT_SECRET: &str = "dev-secret";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid {name}: {detail}")]
    Invalid { name: &'static str, detail: String },
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    /// Only consulted when built with the `postgres` feature.
    pub database_url: Option<String>,
}

impl ApiSettings {
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let bind_addr = lookup("FORGECRM_BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| SettingsError::Invalid {
                name: "FORGECRM_BIND_ADDR",
                detail: e.to_string(),
            })?;

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let ttl_minutes = match lookup("FORGECRM_TOKEN_TTL_MINUTES") {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|m| *m > 0)
                .ok_or_else(|| SettingsError::Invalid {
                    name: "FORGECRM_TOKEN_TTL_MINUTES",
                    detail: format!("'{raw}' is not a positive number of minutes"),
                })?,
            None => DEFAULT_TOKEN_TTL_MINUTES,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            token_ttl: Duration::minutes(ttl_minutes),
            database_url: lookup("DATABASE_URL"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<ApiSettings, SettingsError> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        ApiSettings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let settings = from(&[]).unwrap();
        assert_eq!(settings.bind_addr.to_string(), DEFAULT_BIND_ADDR);
        assert_eq!(settings.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(settings.token_ttl, Duration::minutes(60));
        assert!(settings.database_url.is_none());
    }

    #[test]
    fn explicit_values_win() {
        let settings = from(&[
            ("FORGECRM_BIND_ADDR", "127.0.0.1:9000"),
            ("JWT_SECRET", "s3cret"),
            ("FORGECRM_TOKEN_TTL_MINUTES", "15"),
        ])
        .unwrap();
        assert_eq!(settings.bind_addr.port(), 9000);
        assert_eq!(settings.jwt_secret, "s3cret");
        assert_eq!(settings.token_ttl, Duration::minutes(15));
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(from(&[("FORGECRM_BIND_ADDR", "nowhere")]).is_err());
        assert!(from(&[("FORGECRM_TOKEN_TTL_MINUTES", "0")]).is_err());
        assert!(from(&[("FORGECRM_TOKEN_TTL_MINUTES", "soon")]).is_err());
    }
}
