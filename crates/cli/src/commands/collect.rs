use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use crate::commands::CommandResult;
use farecast_core::config::{AppConfig, LoadOptions};
use farecast_core::{collect, CollectorConfig, HistoryStore, Route};
use farecast_db::{connect_with_settings, migrations, SqlHistoryStore};
use farecast_providers::ProviderChain;

pub fn run(routes: &[String], from: NaiveDate, to: NaiveDate) -> CommandResult {
    if routes.is_empty() {
        return CommandResult::failure(
            "collect",
            "invalid_input",
            "at least one route is required",
            6,
        );
    }
    if from > to {
        return CommandResult::failure(
            "collect",
            "invalid_input",
            format!("--from {from} is after --to {to}"),
            6,
        );
    }

    let mut parsed = Vec::with_capacity(routes.len());
    for raw in routes {
        match raw.parse::<Route>() {
            Ok(route) => parsed.push(route),
            Err(error) => {
                return CommandResult::failure("collect", "invalid_input", error.to_string(), 6);
            }
        }
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "collect",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "collect",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let result = runtime.block_on(async {
        let pool = connect_with_settings(
            &config.database.url,
            config.database.max_connections,
            config.database.timeout_secs,
        )
        .await
        .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), 5u8))?;

        let chain = ProviderChain::from_config(&config.providers)
            .map_err(|error| ("provider_init", error.to_string(), 7u8))?;

        let collector = CollectorConfig {
            currency: config.collection.currency.clone(),
            sample_delay_ms: config.collection.sample_delay_ms,
        };
        let mut rng = StdRng::from_entropy();
        let points = collect(&chain, &parsed, from, to, &collector, &mut rng).await;

        SqlHistoryStore::new(pool.clone())
            .append(&points)
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;
        pool.close().await;

        Ok::<usize, (&'static str, String, u8)>(points.len())
    });

    match result {
        Ok(count) => CommandResult::success_with_details(
            "collect",
            format!("stored {count} price points"),
            json!({ "points": count, "routes": parsed.len() }),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("collect", error_class, message, exit_code)
        }
    }
}
