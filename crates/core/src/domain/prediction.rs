use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Binary advisory output.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    BuyNow,
    Wait,
}

/// Historical price band for the relevant month.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub average: f64,
    pub max: f64,
}

impl PriceRange {
    /// Build a range, enforcing min <= average <= max.
    pub fn new(min: f64, average: f64, max: f64) -> Result<Self, DomainError> {
        if !(min <= average && average <= max) {
            return Err(DomainError::InvariantViolation(format!(
                "price range out of order: min {min}, average {average}, max {max}"
            )));
        }
        Ok(Self { min, average, max })
    }

    /// Width of the band; zero when the range collapses to a single price.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

/// The engine's output record. Created fresh on every prediction call and
/// never mutated; the A/B framework produces an adjusted copy rather than
/// editing in place.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePrediction {
    pub current_price: f64,
    pub currency: String,
    pub timestamp: DateTime<Utc>,
    /// Probability the fare rises before departure. Sums to 1.0 with
    /// `probability_decrease`.
    pub probability_increase: f64,
    pub probability_decrease: f64,
    /// Heuristic trust score in 0..=100, not a calibrated probability.
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub historical_context: String,
    pub price_range: PriceRange,
}

impl PricePrediction {
    /// Copy with only the recommendation replaced, used by experiment
    /// variants.
    pub fn with_recommendation(&self, recommendation: Recommendation) -> Self {
        Self { recommendation, ..self.clone() }
    }
}
