use std::sync::Arc;

use farecast_core::config::{AppConfig, ConfigError, LoadOptions};
use farecast_db::{connect_with_settings, migrations, DbPool, SqlExperimentStore, SqlHistoryStore};
use farecast_providers::{ProviderChain, ProviderError};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub history: Arc<SqlHistoryStore>,
    pub experiments: Arc<SqlExperimentStore>,
    pub quote_source: ProviderChain,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("provider client construction failed: {0}")]
    Provider(#[source] ProviderError),
}

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

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let quote_source =
        ProviderChain::from_config(&config.providers).map_err(BootstrapError::Provider)?;
    info!(
        event_name = "system.bootstrap.providers_ready",
        correlation_id = "bootstrap",
        providers = ?quote_source.provider_names(),
        "provider chain assembled"
    );

    Ok(Application {
        history: Arc::new(SqlHistoryStore::new(db_pool.clone())),
        experiments: Arc::new(SqlExperimentStore::new(db_pool.clone())),
        quote_source,
        config,
        db_pool,
    })
}

#[cfg(test)]
mod tests {
    use farecast_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn memory_options() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:?cache=shared".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_migrates_the_schema_and_wires_stores() {
        let app = bootstrap(memory_options()).await.expect("bootstrap");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN \
             ('price_history', 'backtest_log', 'validation_cache', 'experiment_log')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("baseline tables available after bootstrap");
        assert_eq!(table_count, 4, "bootstrap should expose all engine tables");

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn unconfigured_instance_falls_back_to_the_mock_provider() {
        let app = bootstrap(memory_options()).await.expect("bootstrap");

        assert_eq!(app.quote_source.provider_names(), vec!["mock"]);

        app.db_pool.close().await;
    }
}
