use chrono::{NaiveDate, Utc};
use serde_json::json;

use crate::commands::CommandResult;
use farecast_core::config::{AppConfig, LoadOptions};
use farecast_core::{
    aggregate, FareQuery, HistoryStore, ModelConfig, PredictionInput, PriceModel, QuoteSource,
    Route, DEFAULT_FALLBACK_PRICE,
};
use farecast_db::{connect_with_settings, migrations, SqlHistoryStore};
use farecast_providers::ProviderChain;

pub fn run(origin: &str, destination: &str, departure: NaiveDate) -> CommandResult {
    let route = match Route::new(origin, destination) {
        Ok(route) => route,
        Err(error) => {
            return CommandResult::failure("predict", "invalid_input", error.to_string(), 6);
        }
    };

    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "predict",
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
                "predict",
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

        let history = SqlHistoryStore::new(pool.clone())
            .load_series(Some(&route))
            .await
            .map_err(|error| ("persistence", error.to_string(), 4u8))?;

        let query = FareQuery {
            route: route.clone(),
            departure_date: departure,
            return_date: None,
            currency: config.collection.currency.clone(),
            direct_only: false,
        };
        let quotes = chain.search(&query).await;

        let current_price =
            quotes.iter().map(|quote| quote.amount).fold(f64::INFINITY, f64::min);
        let current_price =
            if current_price.is_finite() { current_price } else { DEFAULT_FALLBACK_PRICE };

        let model = PriceModel::new(ModelConfig {
            variant: config.model.variant,
            strictness: config.model.strictness,
        });
        let prediction = model.predict(
            &PredictionInput {
                current_price,
                currency: &query.currency,
                route: &route,
                departure_date: departure,
                observed_on: Utc::now().date_naive(),
                history: &history,
            },
            &mut rand::thread_rng(),
        );

        let aggregated = aggregate(&quotes, Some(prediction.price_range.clone()), Utc::now());
        pool.close().await;

        Ok::<serde_json::Value, (&'static str, String, u8)>(json!({
            "route": route.to_string(),
            "prediction": prediction,
            "aggregated": aggregated,
            "history_points": history.len(),
            "quote_count": quotes.len(),
        }))
    });

    match result {
        Ok(details) => CommandResult::success_with_details(
            "predict",
            format!("advisory computed for {route}"),
            details,
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("predict", error_class, message, exit_code)
        }
    }
}
