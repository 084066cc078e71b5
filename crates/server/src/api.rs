//! Advisory JSON API.
//!
//! Endpoints:
//! - `POST /api/v1/predict`    — buy-now / wait advisory for a route and date
//! - `GET  /api/v1/validation` — backtest statistics, A/B metrics, winner
//! - `GET  /api/v1/routes`     — routes with curated seasonal coverage

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{NaiveDate, Utc};
use farecast_core::{
    aggregate, curated_routes, AbMetrics, AggregatedPrice, ApplicationError, ExperimentEngine,
    FareQuery, HistoryStore, InterfaceError, PredictionInput, PriceModel, PricePrediction,
    QuoteSource, Route, ValidationResult, WinningVariant, DEFAULT_FALLBACK_PRICE,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ApiState {
    pub history: Arc<dyn HistoryStore>,
    pub experiments: ExperimentEngine,
    pub quotes: Arc<dyn QuoteSource>,
    pub model: PriceModel,
    pub default_currency: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/predict", post(predict))
        .route("/api/v1/validation", get(validation))
        .route("/api/v1/routes", get(routes))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct PredictRequest {
    pub origin: String,
    pub destination: String,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub direct_only: Option<bool>,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub route: String,
    pub prediction: PricePrediction,
    pub aggregated: Option<AggregatedPrice>,
    /// Set when the caller supplied a user_id and an experiment variant
    /// re-decided the recommendation.
    pub variant_id: Option<String>,
    pub history_points: usize,
    /// Accuracy from the cached validation run, when one is fresh.
    pub validated_accuracy: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub validation: Option<ValidationResult>,
    pub ab_metrics: Vec<AbMetrics>,
    pub winning_variant: Option<WinningVariant>,
}

#[derive(Debug, Serialize)]
pub struct RoutesResponse {
    pub routes: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: &'static str,
    pub correlation_id: String,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub async fn predict(
    State(state): State<ApiState>,
    Json(request): Json<PredictRequest>,
) -> Result<Json<PredictResponse>, (StatusCode, Json<ErrorBody>)> {
    let correlation_id = Uuid::new_v4().to_string();

    let route = Route::new(&request.origin, &request.destination)
        .map_err(|error| reject(ApplicationError::from(error), &correlation_id))?;
    let currency = request.currency.unwrap_or_else(|| state.default_currency.clone());

    let query = FareQuery {
        route: route.clone(),
        departure_date: request.departure_date,
        return_date: request.return_date,
        currency: currency.clone(),
        direct_only: request.direct_only.unwrap_or(false),
    };
    let quotes = state.quotes.search(&query).await;

    let history = state
        .history
        .load_series(Some(&route))
        .await
        .map_err(|error| reject(error, &correlation_id))?;

    // The cheapest live quote stands in for the current price; without any
    // quote the documented 400-unit default applies.
    let current_price = quotes
        .iter()
        .map(|quote| quote.amount)
        .fold(f64::INFINITY, f64::min);
    let current_price =
        if current_price.is_finite() { current_price } else { DEFAULT_FALLBACK_PRICE };

    let today = Utc::now().date_naive();
    let prediction = state.model.predict(
        &PredictionInput {
            current_price,
            currency: &currency,
            route: &route,
            departure_date: request.departure_date,
            observed_on: today,
            history: &history,
        },
        &mut rand::thread_rng(),
    );

    let aggregated = aggregate(&quotes, Some(prediction.price_range.clone()), Utc::now());

    let (prediction, variant_id) = match request.user_id.as_deref() {
        Some(user_id) => {
            let variant = state.experiments.assign(user_id);
            let adjusted = farecast_core::apply_variant(&prediction, variant);
            state
                .experiments
                .record_exposure(user_id, &route, &adjusted)
                .await
                .map_err(|error| reject(error, &correlation_id))?;
            (adjusted, Some(variant.id.to_string()))
        }
        None => (prediction, None),
    };

    let validated_accuracy = state
        .history
        .load_validation()
        .await
        .map_err(|error| reject(error, &correlation_id))?
        .map(|result| result.accuracy);

    info!(
        event_name = "api.predict.served",
        correlation_id = %correlation_id,
        route = %route,
        recommendation = ?prediction.recommendation,
        quote_count = quotes.len(),
        "prediction served"
    );

    Ok(Json(PredictResponse {
        route: route.to_string(),
        prediction,
        aggregated,
        variant_id,
        history_points: history.len(),
        validated_accuracy,
    }))
}

pub async fn validation(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<ValidationResponse>), (StatusCode, Json<ErrorBody>)> {
    let correlation_id = Uuid::new_v4().to_string();

    let validation = state
        .history
        .load_validation()
        .await
        .map_err(|error| reject(error, &correlation_id))?;
    let ab_metrics =
        state.experiments.metrics().await.map_err(|error| reject(error, &correlation_id))?;
    let winning_variant = farecast_core::winning_variant(&ab_metrics);

    let status = if validation.is_some() { StatusCode::OK } else { StatusCode::NOT_FOUND };
    Ok((status, Json(ValidationResponse { validation, ab_metrics, winning_variant })))
}

pub async fn routes(State(_state): State<ApiState>) -> Json<RoutesResponse> {
    Json(RoutesResponse { routes: curated_routes() })
}

fn reject(error: ApplicationError, correlation_id: &str) -> (StatusCode, Json<ErrorBody>) {
    let interface = error.into_interface(correlation_id);
    warn!(
        event_name = "api.request.rejected",
        correlation_id = %correlation_id,
        error = %interface,
        "request rejected"
    );

    let status = match &interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            message: interface.user_message(),
            correlation_id: correlation_id.to_string(),
        }),
    )
}
