//! A/B experimentation over recommendation thresholds.
//!
//! Users are assigned one of three fixed variants by a deterministic hash,
//! and a variant only ever overrides the recommendation field of a
//! prediction. Results accumulate in an append-only log behind the
//! `ExperimentStore` seam; metrics are recomputed from the full log on
//! every call rather than kept as incremental state.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{PricePrediction, Recommendation, Route};
use crate::errors::ApplicationError;
use crate::stores::ExperimentStore;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariantMode {
    Conservative,
    Balanced,
    Aggressive,
}

/// One recommendation-threshold configuration under test.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbVariant {
    pub id: &'static str,
    pub confidence_threshold: f64,
    pub mode: VariantMode,
}

/// The fixed variant set. Assignment indexes into this array, so the order
/// is part of the sticky-assignment contract.
pub const VARIANTS: [AbVariant; 3] = [
    AbVariant { id: "conservative", confidence_threshold: 85.0, mode: VariantMode::Conservative },
    AbVariant { id: "balanced", confidence_threshold: 75.0, mode: VariantMode::Balanced },
    AbVariant { id: "aggressive", confidence_threshold: 65.0, mode: VariantMode::Aggressive },
];

/// Sticky deterministic user-to-variant assignment.
pub fn assign(user_id: &str) -> &'static AbVariant {
    let digest = blake3::hash(user_id.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.as_bytes()[..8]);
    let bucket = u64::from_le_bytes(prefix) % VARIANTS.len() as u64;
    &VARIANTS[bucket as usize]
}

/// Re-decide only the recommendation using the variant's thresholds; every
/// other field of the prediction passes through untouched.
pub fn apply_variant(prediction: &PricePrediction, variant: &AbVariant) -> PricePrediction {
    let confident = prediction.confidence >= variant.confidence_threshold;
    let buy = match variant.mode {
        VariantMode::Conservative => confident && prediction.probability_increase >= 0.8,
        VariantMode::Balanced => confident && prediction.probability_increase >= 0.75,
        VariantMode::Aggressive => confident || prediction.probability_increase >= 0.6,
    };
    prediction.with_recommendation(if buy { Recommendation::BuyNow } else { Recommendation::Wait })
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserAction {
    Followed,
    Ignored,
}

/// One appended log row: an exposure, a tracked action, or a resolved
/// outcome. Rows are keyed by (user, timestamp) and never updated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbResult {
    pub variant_id: String,
    pub user_id: String,
    pub route: Route,
    pub recommendation: Recommendation,
    pub recorded_at: DateTime<Utc>,
    pub user_action: Option<UserAction>,
    pub success: Option<bool>,
    pub savings_estimate: Option<f64>,
}

/// Per-variant aggregate recomputed from the full log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AbMetrics {
    pub variant_id: String,
    pub exposures: usize,
    pub resolved: usize,
    pub success_rate: f64,
    pub follow_rate: f64,
    /// 95% normal-approximation interval on the success rate.
    pub confidence_interval: (f64, f64),
}

/// The winner determination. `significant` uses interval non-overlap, an
/// approximation rather than a proper hypothesis test.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WinningVariant {
    pub variant_id: String,
    pub success_rate: f64,
    pub significant: bool,
}

pub fn compute_metrics(log: &[AbResult]) -> Vec<AbMetrics> {
    VARIANTS
        .iter()
        .map(|variant| {
            let rows: Vec<&AbResult> =
                log.iter().filter(|row| row.variant_id == variant.id).collect();
            let exposures = rows.len();

            let with_action: Vec<&&AbResult> =
                rows.iter().filter(|row| row.user_action.is_some()).collect();
            let followed = with_action
                .iter()
                .filter(|row| row.user_action == Some(UserAction::Followed))
                .count();
            let follow_rate = if with_action.is_empty() {
                0.0
            } else {
                followed as f64 / with_action.len() as f64
            };

            let resolved: Vec<&&AbResult> =
                rows.iter().filter(|row| row.success.is_some()).collect();
            let successes = resolved.iter().filter(|row| row.success == Some(true)).count();
            let success_rate = if resolved.is_empty() {
                0.0
            } else {
                successes as f64 / resolved.len() as f64
            };

            let confidence_interval = if resolved.is_empty() {
                (0.0, 0.0)
            } else {
                let n = resolved.len() as f64;
                let half_width = 1.96 * (success_rate * (1.0 - success_rate) / n).sqrt();
                ((success_rate - half_width).max(0.0), (success_rate + half_width).min(1.0))
            };

            AbMetrics {
                variant_id: variant.id.to_string(),
                exposures,
                resolved: resolved.len(),
                success_rate,
                follow_rate,
                confidence_interval,
            }
        })
        .collect()
}

/// Highest success rate wins; significance requires its interval's lower
/// bound to clear the runner-up's upper bound.
pub fn winning_variant(metrics: &[AbMetrics]) -> Option<WinningVariant> {
    let mut ranked: Vec<&AbMetrics> = metrics.iter().filter(|m| m.resolved > 0).collect();
    if ranked.is_empty() {
        return None;
    }
    ranked.sort_by(|a, b| {
        b.success_rate.partial_cmp(&a.success_rate).unwrap_or(std::cmp::Ordering::Equal)
    });

    let winner = ranked[0];
    let significant = match ranked.get(1) {
        Some(runner_up) => winner.confidence_interval.0 > runner_up.confidence_interval.1,
        None => false,
    };

    Some(WinningVariant {
        variant_id: winner.variant_id.clone(),
        success_rate: winner.success_rate,
        significant,
    })
}

/// Store-backed front door for the experiment framework.
#[derive(Clone)]
pub struct ExperimentEngine {
    store: Arc<dyn ExperimentStore>,
}

impl ExperimentEngine {
    pub fn new(store: Arc<dyn ExperimentStore>) -> Self {
        Self { store }
    }

    pub fn assign(&self, user_id: &str) -> &'static AbVariant {
        assign(user_id)
    }

    /// Log one recommendation exposure for the user's assigned variant.
    pub async fn record_exposure(
        &self,
        user_id: &str,
        route: &Route,
        prediction: &PricePrediction,
    ) -> Result<(), ApplicationError> {
        let variant = assign(user_id);
        self.store
            .append_result(&AbResult {
                variant_id: variant.id.to_string(),
                user_id: user_id.to_string(),
                route: route.clone(),
                recommendation: prediction.recommendation,
                recorded_at: Utc::now(),
                user_action: None,
                success: None,
                savings_estimate: None,
            })
            .await
    }

    /// Append a follow/ignore action against the user's variant.
    pub async fn track_user_action(
        &self,
        user_id: &str,
        route: &Route,
        recommendation: Recommendation,
        action: UserAction,
    ) -> Result<(), ApplicationError> {
        let variant = assign(user_id);
        self.store
            .append_result(&AbResult {
                variant_id: variant.id.to_string(),
                user_id: user_id.to_string(),
                route: route.clone(),
                recommendation,
                recorded_at: Utc::now(),
                user_action: Some(action),
                success: None,
                savings_estimate: None,
            })
            .await
    }

    /// Append a resolved outcome once the fare's later movement is known.
    pub async fn record_outcome(
        &self,
        user_id: &str,
        route: &Route,
        recommendation: Recommendation,
        success: bool,
        savings_estimate: Option<f64>,
    ) -> Result<(), ApplicationError> {
        let variant = assign(user_id);
        self.store
            .append_result(&AbResult {
                variant_id: variant.id.to_string(),
                user_id: user_id.to_string(),
                route: route.clone(),
                recommendation,
                recorded_at: Utc::now(),
                user_action: None,
                success: Some(success),
                savings_estimate,
            })
            .await
    }

    pub async fn metrics(&self) -> Result<Vec<AbMetrics>, ApplicationError> {
        let log = self.store.load_results().await?;
        Ok(compute_metrics(&log))
    }

    pub async fn winning_variant(&self) -> Result<Option<WinningVariant>, ApplicationError> {
        Ok(winning_variant(&self.metrics().await?))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{
        apply_variant, assign, compute_metrics, winning_variant, AbResult, UserAction, VariantMode,
        VARIANTS,
    };
    use crate::domain::{PricePrediction, PriceRange, Recommendation, Route};

    fn prediction(probability_increase: f64, confidence: f64) -> PricePrediction {
        PricePrediction {
            current_price: 700.0,
            currency: "USD".to_string(),
            timestamp: Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).single().expect("timestamp"),
            probability_increase,
            probability_decrease: 1.0 - probability_increase,
            confidence,
            recommendation: Recommendation::Wait,
            historical_context: String::new(),
            price_range: PriceRange { min: 680.0, average: 750.0, max: 820.0 },
        }
    }

    fn row(variant_id: &str, action: Option<UserAction>, success: Option<bool>) -> AbResult {
        AbResult {
            variant_id: variant_id.to_string(),
            user_id: "user-1".to_string(),
            route: "LHR-JFK".parse().expect("route"),
            recommendation: Recommendation::BuyNow,
            recorded_at: Utc.with_ymd_and_hms(2026, 7, 1, 0, 0, 0).single().expect("timestamp"),
            user_action: action,
            success,
            savings_estimate: None,
        }
    }

    #[test]
    fn assignment_is_sticky_and_deterministic() {
        let first = assign("user-42");
        let second = assign("user-42");
        assert_eq!(first.id, second.id);
    }

    #[test]
    fn assignment_spreads_users_across_all_variants() {
        let mut seen = std::collections::HashSet::new();
        for i in 0..100 {
            seen.insert(assign(&format!("user-{i}")).id);
        }
        assert_eq!(seen.len(), VARIANTS.len());
    }

    #[test]
    fn conservative_variant_needs_both_confidence_and_probability() {
        let variant = &VARIANTS[0];
        assert_eq!(variant.mode, VariantMode::Conservative);

        let buy = apply_variant(&prediction(0.85, 90.0), variant);
        assert_eq!(buy.recommendation, Recommendation::BuyNow);

        let low_probability = apply_variant(&prediction(0.7, 90.0), variant);
        assert_eq!(low_probability.recommendation, Recommendation::Wait);

        let low_confidence = apply_variant(&prediction(0.85, 70.0), variant);
        assert_eq!(low_confidence.recommendation, Recommendation::Wait);
    }

    #[test]
    fn aggressive_variant_buys_on_either_signal() {
        let variant = &VARIANTS[2];
        assert_eq!(variant.mode, VariantMode::Aggressive);

        let on_confidence = apply_variant(&prediction(0.3, 80.0), variant);
        assert_eq!(on_confidence.recommendation, Recommendation::BuyNow);

        let on_probability = apply_variant(&prediction(0.65, 60.0), variant);
        assert_eq!(on_probability.recommendation, Recommendation::BuyNow);

        let neither = apply_variant(&prediction(0.4, 60.0), variant);
        assert_eq!(neither.recommendation, Recommendation::Wait);
    }

    #[test]
    fn apply_variant_touches_only_the_recommendation() {
        let original = prediction(0.85, 90.0);
        let adjusted = apply_variant(&original, &VARIANTS[0]);

        assert_eq!(adjusted.probability_increase, original.probability_increase);
        assert_eq!(adjusted.confidence, original.confidence);
        assert_eq!(adjusted.price_range, original.price_range);
    }

    #[test]
    fn metrics_recompute_rates_from_the_full_log() {
        let log = vec![
            row("balanced", None, None),
            row("balanced", Some(UserAction::Followed), None),
            row("balanced", Some(UserAction::Ignored), None),
            row("balanced", None, Some(true)),
            row("balanced", None, Some(true)),
            row("balanced", None, Some(false)),
        ];

        let metrics = compute_metrics(&log);
        let balanced = metrics.iter().find(|m| m.variant_id == "balanced").expect("balanced");

        assert_eq!(balanced.exposures, 6);
        assert_eq!(balanced.resolved, 3);
        assert_eq!(balanced.follow_rate, 0.5);
        assert!((balanced.success_rate - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn winner_requires_interval_separation_for_significance() {
        let mut log = Vec::new();
        // Aggressive: 98 of 100 successes; balanced: 2 of 100.
        for _ in 0..98 {
            log.push(row("aggressive", None, Some(true)));
        }
        for _ in 0..2 {
            log.push(row("aggressive", None, Some(false)));
        }
        for _ in 0..2 {
            log.push(row("balanced", None, Some(true)));
        }
        for _ in 0..98 {
            log.push(row("balanced", None, Some(false)));
        }

        let winner = winning_variant(&compute_metrics(&log)).expect("winner");
        assert_eq!(winner.variant_id, "aggressive");
        assert!(winner.significant);
    }

    #[test]
    fn close_rates_are_not_declared_significant() {
        let mut log = Vec::new();
        for _ in 0..6 {
            log.push(row("aggressive", None, Some(true)));
        }
        for _ in 0..4 {
            log.push(row("aggressive", None, Some(false)));
        }
        for _ in 0..5 {
            log.push(row("balanced", None, Some(true)));
        }
        for _ in 0..5 {
            log.push(row("balanced", None, Some(false)));
        }

        let winner = winning_variant(&compute_metrics(&log)).expect("winner");
        assert_eq!(winner.variant_id, "aggressive");
        assert!(!winner.significant);
    }

    #[test]
    fn no_resolved_rows_means_no_winner() {
        let log = vec![row("balanced", None, None)];
        assert!(winning_variant(&compute_metrics(&log)).is_none());
    }
}
