//! Multi-source price aggregation.
//!
//! Combines live provider quotes with a synthetic triplet taken from the
//! recommendation model's price range. The arithmetic here is deliberately
//! deterministic: all randomness lives in the model's jitter, so identical
//! inputs always aggregate to identical outputs. Fetching the live quotes
//! is the caller's job; this module only does the math.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::PriceRange;

/// Price callers substitute when aggregation yields nothing at all.
pub const DEFAULT_FALLBACK_PRICE: f64 = 400.0;

/// How many individual recent quotes join the pool alongside the averages.
const MAX_INDIVIDUAL_QUOTES: usize = 3;

/// One live quote as fetched from a provider.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FareObservation {
    pub amount: f64,
    pub currency: String,
    pub observed_at: DateTime<Utc>,
}

/// Pooled estimate across every contributing source.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPrice {
    pub average_price: f64,
    pub min_price: f64,
    pub max_price: f64,
    pub price_count: usize,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub last_updated: DateTime<Utc>,
}

/// Recency weight for a live quote: fresher quotes count for more.
fn recency_weight(observed_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - observed_at).num_days();
    if age_days <= 1 {
        3.0
    } else if age_days <= 7 {
        2.0
    } else if age_days <= 30 {
        1.5
    } else {
        1.0
    }
}

/// Pool live quotes and the model's synthetic range into one estimate.
///
/// Returns `None` when there is nothing to pool (no quotes and no model
/// range); callers fall back to [`DEFAULT_FALLBACK_PRICE`].
pub fn aggregate(
    quotes: &[FareObservation],
    model_range: Option<PriceRange>,
    now: DateTime<Utc>,
) -> Option<AggregatedPrice> {
    let mut pool: Vec<f64> = Vec::new();
    let mut sources: Vec<String> = Vec::new();

    if !quotes.is_empty() {
        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut simple_sum = 0.0;
        for quote in quotes {
            let weight = recency_weight(quote.observed_at, now);
            weighted_sum += quote.amount * weight;
            weight_total += weight;
            simple_sum += quote.amount;
        }
        pool.push(weighted_sum / weight_total);
        pool.push(simple_sum / quotes.len() as f64);

        // Up to three of the freshest quotes join individually so one stale
        // average cannot mask a recent swing.
        let mut recent: Vec<&FareObservation> = quotes.iter().collect();
        recent.sort_by_key(|quote| std::cmp::Reverse(quote.observed_at));
        for quote in recent.into_iter().take(MAX_INDIVIDUAL_QUOTES) {
            pool.push(quote.amount);
        }

        sources.push("live_quotes".to_string());
    }

    // The synthetic triplet is a stabilizing prior from the seasonal model.
    if let Some(range) = model_range {
        pool.push(range.min);
        pool.push(range.average);
        pool.push(range.max);
        sources.push("seasonal_model".to_string());
    }

    if pool.is_empty() {
        return None;
    }

    let count = pool.len();
    let sum: f64 = pool.iter().sum();
    let average = sum / count as f64;
    let min = pool.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = pool.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    Some(AggregatedPrice {
        average_price: average,
        min_price: min,
        max_price: max,
        price_count: count,
        confidence: pool_confidence(&pool, average, sources.len()),
        sources,
        last_updated: now,
    })
}

fn pool_confidence(pool: &[f64], average: f64, source_count: usize) -> f64 {
    let mut confidence: f64 = 75.0;

    if source_count >= 2 {
        confidence += 10.0;
    }
    if pool.len() >= 10 {
        confidence += 5.0;
    }

    let variance =
        pool.iter().map(|value| (value - average).powi(2)).sum::<f64>() / pool.len() as f64;
    let coefficient_of_variation =
        if average.abs() > f64::EPSILON { variance.sqrt() / average } else { 0.0 };

    if coefficient_of_variation < 0.15 {
        confidence += 10.0;
    } else if coefficient_of_variation > 0.3 {
        confidence -= 10.0;
    }

    confidence.clamp(50.0, 95.0)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{aggregate, FareObservation, DEFAULT_FALLBACK_PRICE};
    use crate::domain::PriceRange;

    fn quote(amount: f64, age_days: i64, now: chrono::DateTime<Utc>) -> FareObservation {
        FareObservation {
            amount,
            currency: "USD".to_string(),
            observed_at: now - Duration::days(age_days),
        }
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 12, 0, 0).single().expect("timestamp")
    }

    #[test]
    fn pools_live_quotes_with_synthetic_triplet() {
        let now = now();
        let quotes = vec![quote(700.0, 0, now), quote(720.0, 3, now), quote(760.0, 20, now)];
        let range = PriceRange { min: 680.0, average: 750.0, max: 820.0 };

        let result = aggregate(&quotes, Some(range), now).expect("non-empty pool");

        // weighted avg + simple avg + 3 individual + 3 synthetic
        assert_eq!(result.price_count, 8);
        assert_eq!(result.sources, vec!["live_quotes", "seasonal_model"]);
        assert_eq!(result.min_price, 680.0);
        assert_eq!(result.max_price, 820.0);
        assert!(result.average_price > 680.0 && result.average_price < 820.0);
    }

    #[test]
    fn fresher_quotes_pull_the_weighted_average_harder() {
        let now = now();
        // Fresh cheap quote vs old expensive quote: weight 3 vs 1.
        let quotes = vec![quote(600.0, 0, now), quote(1000.0, 60, now)];

        let result = aggregate(&quotes, None, now).expect("non-empty pool");

        // weighted avg = (600*3 + 1000*1) / 4 = 700; simple avg = 800.
        let weighted = (600.0 * 3.0 + 1000.0) / 4.0;
        assert!((result.average_price - (weighted + 800.0 + 600.0 + 1000.0) / 4.0).abs() < 1e-9);
    }

    #[test]
    fn aggregation_is_idempotent_for_frozen_inputs() {
        let now = now();
        let quotes = vec![quote(700.0, 1, now), quote(710.0, 5, now)];
        let range = PriceRange { min: 680.0, average: 750.0, max: 820.0 };

        let first = aggregate(&quotes, Some(range), now).expect("pool");
        let second = aggregate(&quotes, Some(range), now).expect("pool");

        assert_eq!(first, second);
    }

    #[test]
    fn tight_agreement_raises_confidence() {
        let now = now();
        let quotes = vec![quote(750.0, 0, now), quote(752.0, 2, now), quote(748.0, 3, now)];
        let range = PriceRange { min: 740.0, average: 750.0, max: 760.0 };

        let result = aggregate(&quotes, Some(range), now).expect("pool");

        // 75 base + 10 both sources + 10 tight agreement.
        assert_eq!(result.confidence, 95.0);
    }

    #[test]
    fn wide_disagreement_lowers_confidence() {
        let now = now();
        let quotes = vec![quote(200.0, 0, now), quote(900.0, 2, now)];
        let range = PriceRange { min: 100.0, average: 500.0, max: 1200.0 };

        let result = aggregate(&quotes, Some(range), now).expect("pool");

        // 75 base + 10 both sources - 10 disagreement.
        assert_eq!(result.confidence, 75.0);
    }

    #[test]
    fn synthetic_only_pool_still_aggregates() {
        let now = now();
        let range = PriceRange { min: 256.0, average: 320.0, max: 384.0 };

        let result = aggregate(&[], Some(range), now).expect("synthetic pool");

        assert_eq!(result.price_count, 3);
        assert_eq!(result.sources, vec!["seasonal_model"]);
        assert!((result.average_price - 320.0).abs() < 1e-9);
    }

    #[test]
    fn empty_pool_returns_none_and_callers_use_the_default() {
        let now = now();
        assert!(aggregate(&[], None, now).is_none());
        let fallback = aggregate(&[], None, now)
            .map(|aggregated| aggregated.average_price)
            .unwrap_or(DEFAULT_FALLBACK_PRICE);
        assert_eq!(fallback, 400.0);
    }
}
