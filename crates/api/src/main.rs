use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;

use forgecrm_api::app::{build_app, AppServices};
use forgecrm_api::settings::ApiSettings;
use forgecrm_auth::{Hs256TokenIssuer, InMemoryApiKeyStore, Role};
use forgecrm_config::ConfigStore;
use forgecrm_core::UserId;
use forgecrm_entities::User;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    forgecrm_observability::init();

    let settings = ApiSettings::from_env().context("invalid settings")?;
    let config = config_store(&settings).await?;
    let services = AppServices::bootstrap(config, Arc::new(InMemoryApiKeyStore::new()))
        .await
        .context("failed to seed configuration defaults")?;

    if settings.database_url.is_none() {
        seed_dev_admin(&services, &settings)?;
    }

    let app = build_app(Arc::new(services), &settings.jwt_secret);

    let listener = tokio::net::TcpListener::bind(settings.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

#[cfg(feature = "postgres")]
async fn config_store(settings: &ApiSettings) -> anyhow::Result<ConfigStore> {
    let Some(url) = settings.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory configuration store");
        return Ok(ConfigStore::in_memory());
    };
    let pool = sqlx::PgPool::connect(url)
        .await
        .context("failed to connect to postgres")?;
    Ok(ConfigStore::new(Arc::new(
        forgecrm_config::PostgresConfigRepository::new(pool),
    )))
}

#[cfg(not(feature = "postgres"))]
async fn config_store(settings: &ApiSettings) -> anyhow::Result<ConfigStore> {
    if settings.database_url.is_some() {
        tracing::warn!("DATABASE_URL ignored; built without the postgres feature");
    }
    Ok(ConfigStore::in_memory())
}

/// In-memory mode starts with no users; create an admin and log a token for it.
fn seed_dev_admin(services: &AppServices, settings: &ApiSettings) -> anyhow::Result<()> {
    let now = Utc::now();
    let admin = User::new(UserId::new(), "admin@localhost", "Dev Admin", Role::Admin, now);
    let issuer = Hs256TokenIssuer::new(&settings.jwt_secret, settings.token_ttl);
    let token = issuer
        .issue(admin.id, admin.role, now)
        .context("failed to issue dev admin token")?;

    tracing::warn!(user_id = %admin.id, token = %token, "seeded dev admin (in-memory mode)");
    services
        .users
        .upsert(admin.id, admin)
        .context("failed to store dev admin")?;
    Ok(())
}
