//! Statistical validation of the recommendation model.
//!
//! Three stages: `collect` builds the historical price series (live quotes
//! where a provider answers, synthetic samples otherwise), `backtest`
//! replays the model against past points using only data that preceded
//! them, and `validate` aggregates the trials into accuracy and error
//! statistics with a normal-approximation confidence interval.

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{HistoricalPricePoint, Recommendation, Route};
use crate::errors::DomainError;
use crate::model::{PredictionInput, PriceModel};
use crate::seasonal;
use crate::stores::{FareQuery, QuoteSource};

/// Booking-window offsets sampled during collection, in days before
/// departure.
pub const BOOKING_OFFSETS_DAYS: [i64; 7] = [7, 14, 21, 30, 45, 60, 90];

/// A cached `ValidationResult` older than this is treated as absent.
pub const VALIDATION_TTL_HOURS: i64 = 24;

/// Tolerance when matching a backtest trial to its future observation.
const MATCH_TOLERANCE_DAYS: i64 = 2;

/// Minimum subsequent points a trial needs before it is scored.
const MIN_SUBSEQUENT_POINTS: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BacktestOutcome {
    Correct,
    Incorrect,
}

/// One replayed prediction compared against a later observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub route: Route,
    pub prediction_date: NaiveDate,
    pub predicted_price: f64,
    pub actual_price: f64,
    pub error: f64,
    pub percentage_error: f64,
    pub recommendation: Recommendation,
    pub outcome: BacktestOutcome,
    pub days_ahead: i64,
}

/// Aggregate statistics over a set of backtest trials.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Fraction of trials where the recommendation was correct.
    pub accuracy: f64,
    pub mean_absolute_error: f64,
    pub root_mean_square_error: f64,
    /// 95% normal-approximation interval on accuracy, clamped to [0, 1].
    pub confidence_interval: (f64, f64),
    pub sample_size: usize,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub computed_at: DateTime<Utc>,
}

impl ValidationResult {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.computed_at < Duration::hours(VALIDATION_TTL_HOURS)
    }
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct CollectorConfig {
    pub currency: String,
    /// Pause between provider calls; external APIs rate-limit aggressively.
    pub sample_delay_ms: u64,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self { currency: "USD".to_string(), sample_delay_ms: 200 }
    }
}

/// Sample fares weekly across a date range for each route and booking
/// offset. A provider miss never aborts the run; the sample degrades to a
/// synthetic point instead.
pub async fn collect<R>(
    source: &dyn QuoteSource,
    routes: &[Route],
    start: NaiveDate,
    end: NaiveDate,
    config: &CollectorConfig,
    rng: &mut R,
) -> Vec<HistoricalPricePoint>
where
    R: Rng,
{
    let mut points = Vec::new();

    for route in routes {
        let mut observed_on = start;
        while observed_on <= end {
            for offset in BOOKING_OFFSETS_DAYS {
                let departure = observed_on + Duration::days(offset);
                let query = FareQuery {
                    route: route.clone(),
                    departure_date: departure,
                    return_date: None,
                    currency: config.currency.clone(),
                    direct_only: false,
                };

                let point = match source.cheapest(&query).await {
                    Some(price) => HistoricalPricePoint::observed(
                        route.clone(),
                        price,
                        config.currency.clone(),
                        observed_on,
                        departure,
                        true,
                    ),
                    None => {
                        debug!(
                            route = %route,
                            departure = %departure,
                            "no live quote, substituting synthetic sample"
                        );
                        HistoricalPricePoint::observed(
                            route.clone(),
                            synthetic_price(route, observed_on, departure, rng),
                            config.currency.clone(),
                            observed_on,
                            departure,
                            false,
                        )
                    }
                };
                points.push(point);

                if config.sample_delay_ms > 0 {
                    tokio::time::sleep(std::time::Duration::from_millis(config.sample_delay_ms))
                        .await;
                }
            }
            observed_on += Duration::days(7);
        }
    }

    points
}

/// Seasonal-average fare scaled by booking-window and day-of-week
/// multipliers plus bounded randomness, clamped to a widened monthly band.
pub fn synthetic_price<R: Rng>(
    route: &Route,
    observed_on: NaiveDate,
    departure: NaiveDate,
    rng: &mut R,
) -> f64 {
    let profile = seasonal::lookup(route, departure.month()).profile;
    let booking_days = (departure - observed_on).num_days();

    let window_multiplier = if booking_days < 7 {
        1.35
    } else if booking_days < 14 {
        1.2
    } else if booking_days < 21 {
        1.1
    } else if booking_days < 30 {
        1.05
    } else if booking_days < 60 {
        1.0
    } else {
        0.9
    };

    let weekday = departure.weekday().number_from_monday();
    let weekday_multiplier = if weekday >= 6 { 1.05 } else { 1.0 };

    let noise = 1.0 + rng.gen_range(-0.1..=0.1);
    (profile.average_price * window_multiplier * weekday_multiplier * noise)
        .clamp(profile.min_price * 0.8, profile.max_price * 1.2)
}

// ---------------------------------------------------------------------------
// Backtesting
// ---------------------------------------------------------------------------

/// Replay the model across the trailing `test_period_days` of the series.
///
/// For each point with enough subsequent observations, the price forecast is
/// the mean of strictly-prior prices on the same route (points with no prior
/// data are skipped), the recommendation comes from the model at that
/// point's price, and the trial is scored against the closest future point
/// whose booking window matches the original minus seven days.
pub fn backtest<R: Rng>(
    model: &PriceModel,
    series: &[HistoricalPricePoint],
    test_period_days: i64,
    today: NaiveDate,
    rng: &mut R,
) -> Vec<BacktestResult> {
    let cutoff = today - Duration::days(test_period_days);

    let mut by_route: BTreeMap<String, Vec<&HistoricalPricePoint>> = BTreeMap::new();
    for point in series.iter().filter(|p| p.observed_at >= cutoff) {
        by_route.entry(point.route.to_string()).or_default().push(point);
    }

    let mut results = Vec::new();

    for points in by_route.values_mut() {
        points.sort_by_key(|p| p.observed_at);

        for index in 0..points.len() {
            let point = points[index];
            let subsequent = &points[index + 1..];
            if subsequent.len() < MIN_SUBSEQUENT_POINTS {
                continue;
            }

            let prior: Vec<HistoricalPricePoint> =
                points[..index].iter().map(|p| (*p).clone()).collect();
            if prior.is_empty() {
                continue;
            }
            let predicted_price =
                prior.iter().map(|p| p.price).sum::<f64>() / prior.len() as f64;

            let prediction = model.predict(
                &PredictionInput {
                    current_price: point.price,
                    currency: &point.currency,
                    route: &point.route,
                    departure_date: point.departure_date,
                    observed_on: point.observed_at,
                    history: &prior,
                },
                rng,
            );

            let target_window = point.booking_days_ahead - 7;
            let Some(actual) = subsequent
                .iter()
                .filter(|p| (p.booking_days_ahead - target_window).abs() <= MATCH_TOLERANCE_DAYS)
                .min_by_key(|p| (p.booking_days_ahead - target_window).abs())
            else {
                continue;
            };

            let error = actual.price - predicted_price;
            let percentage_error = if actual.price.abs() > f64::EPSILON {
                error / actual.price * 100.0
            } else {
                0.0
            };

            let outcome = match prediction.recommendation {
                // Buying was right when the fare went on to rise.
                Recommendation::BuyNow if actual.price > point.price => BacktestOutcome::Correct,
                // Waiting was right when the fare fell or held.
                Recommendation::Wait if actual.price <= point.price => BacktestOutcome::Correct,
                _ => BacktestOutcome::Incorrect,
            };

            results.push(BacktestResult {
                route: point.route.clone(),
                prediction_date: point.observed_at,
                predicted_price,
                actual_price: actual.price,
                error,
                percentage_error,
                recommendation: prediction.recommendation,
                outcome,
                days_ahead: point.booking_days_ahead,
            });
        }
    }

    results
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Aggregate backtest trials. Fails on an empty set: an accuracy figure
/// cannot be computed from zero trials, and callers must report "not yet
/// validated" instead.
pub fn validate(
    results: &[BacktestResult],
    now: DateTime<Utc>,
) -> Result<ValidationResult, DomainError> {
    if results.is_empty() {
        return Err(DomainError::InsufficientValidationData);
    }

    let n = results.len() as f64;
    let correct =
        results.iter().filter(|r| r.outcome == BacktestOutcome::Correct).count() as f64;
    let accuracy = correct / n;

    let mean_absolute_error = results.iter().map(|r| r.error.abs()).sum::<f64>() / n;
    let root_mean_square_error =
        (results.iter().map(|r| r.error * r.error).sum::<f64>() / n).sqrt();

    let half_width = 1.96 * (accuracy * (1.0 - accuracy) / n).sqrt();
    let confidence_interval =
        ((accuracy - half_width).max(0.0), (accuracy + half_width).min(1.0));

    let period_start =
        results.iter().map(|r| r.prediction_date).min().expect("non-empty results");
    let period_end = results.iter().map(|r| r.prediction_date).max().expect("non-empty results");

    Ok(ValidationResult {
        accuracy,
        mean_absolute_error,
        root_mean_square_error,
        confidence_interval,
        sample_size: results.len(),
        period_start,
        period_end,
        computed_at: now,
    })
}
