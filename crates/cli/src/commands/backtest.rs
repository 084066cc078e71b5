use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use crate::commands::CommandResult;
use farecast_core::config::{AppConfig, LoadOptions};
use farecast_core::{backtest, validate, HistoryStore, ModelConfig, PriceModel};
use farecast_db::{connect_with_settings, migrations, SqlHistoryStore};

pub fn run(days: i64) -> CommandResult {
    if days <= 0 {
        return CommandResult::failure(
            "backtest",
            "invalid_input",
            "--days must be a positive number of days",
            6,
        );
    }

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "backtest",
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
                "backtest",
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

        let store = SqlHistoryStore::new(pool.clone());
        let series = store
            .load_series(None)
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;

        let model = PriceModel::new(ModelConfig {
            variant: config.model.variant,
            strictness: config.model.strictness,
        });
        let mut rng = StdRng::from_entropy();
        let results = backtest(&model, &series, days, Utc::now().date_naive(), &mut rng);

        store
            .append_backtests(&results)
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;

        let validation = validate(&results, Utc::now())
            .map_err(|error| ("insufficient_data", error.to_string(), 6u8))?;
        store
            .save_validation(&validation)
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;
        pool.close().await;

        Ok::<_, (&'static str, String, u8)>(validation)
    });

    match result {
        Ok(validation) => CommandResult::success_with_details(
            "backtest",
            format!("validated {} trials", validation.sample_size),
            json!({ "validation": validation }),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("backtest", error_class, message, exit_code)
        }
    }
}
