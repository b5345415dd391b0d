use std::sync::Arc;

use axum::Router;
use bakehouse_core::config::{AppConfig, ConfigError, LoadOptions};
use bakehouse_db::repositories::{SqlCustomerRepository, SqlOrderRepository};
use bakehouse_db::{connect_with_config, migrations, ClientDirectory, DbPool};
use thiserror::Error;
use tracing::info;

use crate::{clients, health, orders};

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub directory: ClientDirectory,
}

impl Application {
    /// Every route group, merged into one router.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(health::router(self.db_pool.clone()))
            .merge(clients::router(self.directory.clone()))
            .merge(orders::router(self.directory.clone()))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
}

#[cfg_attr(not(test), allow(dead_code))]
pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool =
        connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        max_connections = config.database.max_connections,
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let directory = ClientDirectory::new(
        Arc::new(SqlCustomerRepository::new(db_pool.clone())),
        Arc::new(SqlOrderRepository::new(db_pool.clone())),
        config.clients.clone(),
    );
    info!(
        event_name = "system.bootstrap.directory_ready",
        correlation_id = "bootstrap",
        lookup_policy = config.clients.lookup_policy.as_str(),
        phone_matching = config.clients.phone_matching.as_str(),
        "client directory ready"
    );

    Ok(Application { config, db_pool, directory })
}
