//! Price prediction and recommendation model.
//!
//! A heuristic scorer, not a trained model: probabilities and confidence are
//! formula-derived from the seasonal reference table, the booking window,
//! and bounded jitter. All randomness comes through the caller-supplied
//! `Rng`, so a seeded generator makes every prediction reproducible.

use chrono::{Datelike, Duration, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::domain::{HistoricalPricePoint, PricePrediction, PriceRange, Recommendation, Route};
use crate::seasonal::{self, ProfileSource, RouteSeasonalProfile};

/// Which scoring formula set is in effect.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelVariant {
    /// Probability clamp [0.1, 0.9], confidence base 0.8 with jitter,
    /// confidence clamp [60, 95].
    #[default]
    Standard,
    /// Probability clamp [0.05, 0.95], confidence base 0.6 with data-volume
    /// and month-coverage bonuses instead of jitter, clamp [65, 98].
    Enhanced,
}

/// Which buy-now decision rule applies.
///
/// `Balanced` is the canonical policy. `Strict` reproduces the superseded
/// threshold-only rule and is kept as a configuration, not a code path of
/// its own.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strictness {
    #[default]
    Balanced,
    Strict,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub variant: ModelVariant,
    pub strictness: Strictness,
}

/// Everything a single prediction needs. `history` may be empty; it only
/// feeds the enhanced variant's confidence bonuses.
#[derive(Clone, Debug)]
pub struct PredictionInput<'a> {
    pub current_price: f64,
    pub currency: &'a str,
    pub route: &'a Route,
    pub departure_date: NaiveDate,
    pub observed_on: NaiveDate,
    pub history: &'a [HistoricalPricePoint],
}

/// Bookings closer than this expect a last-minute premium.
const LAST_MINUTE_WINDOW_DAYS: i64 = 14;
/// Bookings further out than this still have room to drift upward.
const EARLY_WINDOW_DAYS: i64 = 90;
/// Weeks of synthesized history consulted for the lowest-price check.
const TRAILING_WEEKS: i64 = 4;

#[derive(Clone, Debug, Default)]
pub struct PriceModel {
    config: ModelConfig,
}

impl PriceModel {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ModelConfig {
        self.config
    }

    /// Produce a buy-now / wait advisory for one observed price.
    pub fn predict<R: Rng>(&self, input: &PredictionInput<'_>, rng: &mut R) -> PricePrediction {
        let month = input.departure_date.month();
        let looked_up = seasonal::lookup(input.route, month);
        let profile = looked_up.profile;

        let price_position = price_position(input.current_price, &profile);
        let booking_days = (input.departure_date - input.observed_on).num_days();

        let probability_increase = self.probability_increase(
            price_position,
            booking_days,
            profile.price_variation,
            rng,
        );
        let probability_decrease = 1.0 - probability_increase;

        let lowest_recently = self.is_lowest_in_trailing_weeks(
            input.current_price,
            input.route,
            input.observed_on,
            rng,
        );

        let confidence = self.confidence(
            price_position,
            profile.price_variation,
            looked_up.source,
            input.route,
            input.history,
            rng,
        );

        let recommendation = match self.config.strictness {
            Strictness::Balanced => {
                if lowest_recently || price_position < 0.6 || probability_increase >= 0.65 {
                    Recommendation::BuyNow
                } else {
                    Recommendation::Wait
                }
            }
            Strictness::Strict => {
                if probability_increase >= 0.8 {
                    Recommendation::BuyNow
                } else {
                    Recommendation::Wait
                }
            }
        };

        // The table guarantees min <= average <= max, so this cannot fail.
        let price_range = PriceRange {
            min: profile.min_price,
            average: profile.average_price,
            max: profile.max_price,
        };

        PricePrediction {
            current_price: input.current_price,
            currency: input.currency.to_string(),
            timestamp: Utc::now(),
            probability_increase,
            probability_decrease,
            confidence,
            recommendation,
            historical_context: historical_context(input, &profile),
            price_range,
        }
    }

    fn probability_increase<R: Rng>(
        &self,
        price_position: f64,
        booking_days: i64,
        variation: f64,
        rng: &mut R,
    ) -> f64 {
        let mut probability = if price_position < 0.3 {
            0.75
        } else if price_position > 0.7 {
            0.25
        } else {
            0.5
        };

        if booking_days < LAST_MINUTE_WINDOW_DAYS {
            probability += 0.2;
        } else if booking_days > EARLY_WINDOW_DAYS {
            probability += 0.1;
        }

        probability += rng.gen_range(-0.1..=0.1) * variation;

        let (low, high) = match self.config.variant {
            ModelVariant::Standard => (0.1, 0.9),
            ModelVariant::Enhanced => (0.05, 0.95),
        };
        probability.clamp(low, high)
    }

    fn confidence<R: Rng>(
        &self,
        price_position: f64,
        variation: f64,
        source: ProfileSource,
        route: &Route,
        history: &[HistoricalPricePoint],
        rng: &mut R,
    ) -> f64 {
        let mut confidence: f64 = match self.config.variant {
            ModelVariant::Standard => 0.8,
            ModelVariant::Enhanced => 0.6,
        };

        if variation > 0.2 {
            confidence -= 0.2;
        }
        // Extremes are easier calls than the middle of the band.
        if price_position < 0.2 || price_position > 0.8 {
            confidence += 0.1;
        }
        if source == ProfileSource::Generic {
            confidence -= 0.05;
        }

        match self.config.variant {
            ModelVariant::Standard => {
                confidence += rng.gen_range(-0.05..=0.05);
                (confidence * 100.0).clamp(60.0, 95.0)
            }
            ModelVariant::Enhanced => {
                confidence += volume_bonus(route, history);
                confidence += coverage_bonus(route, history);
                (confidence * 100.0).clamp(65.0, 98.0)
            }
        }
    }

    /// True only if the current price undercuts a synthesized fare from
    /// every one of the trailing weeks.
    fn is_lowest_in_trailing_weeks<R: Rng>(
        &self,
        current_price: f64,
        route: &Route,
        observed_on: NaiveDate,
        rng: &mut R,
    ) -> bool {
        for week in 1..=TRAILING_WEEKS {
            let week_date = observed_on - Duration::days(week * 7);
            let profile = seasonal::lookup(route, week_date.month()).profile;
            let swing = rng.gen_range(-0.15..=0.15);
            let weekly = (profile.average_price * (1.0 + swing))
                .clamp(profile.min_price * 0.8, profile.max_price * 1.2);
            if current_price >= weekly {
                return false;
            }
        }
        true
    }
}

/// Normalized location of a price inside its monthly band. Values outside
/// [0, 1] mean the price is outside historical bounds, which is informative
/// rather than an error; a zero-width band pins the position to the middle.
pub fn price_position(price: f64, profile: &RouteSeasonalProfile) -> f64 {
    let width = profile.max_price - profile.min_price;
    if width <= f64::EPSILON {
        return 0.5;
    }
    (price - profile.min_price) / width
}

fn volume_bonus(route: &Route, history: &[HistoricalPricePoint]) -> f64 {
    let count = history.iter().filter(|p| &p.route == route).count();
    if count >= 100 {
        0.15
    } else if count >= 30 {
        0.10
    } else if count >= 10 {
        0.05
    } else {
        0.0
    }
}

fn coverage_bonus(route: &Route, history: &[HistoricalPricePoint]) -> f64 {
    let mut months_seen = [false; 12];
    for point in history.iter().filter(|p| &p.route == route) {
        months_seen[(point.month.clamp(1, 12) - 1) as usize] = true;
    }
    let covered = months_seen.iter().filter(|seen| **seen).count() as f64;
    covered / 12.0 * 0.12
}

fn historical_context(input: &PredictionInput<'_>, profile: &RouteSeasonalProfile) -> String {
    let month_name = input.departure_date.format("%B");
    let band = profile.average_price * 0.10;
    let placement = if input.current_price < profile.average_price - band {
        "below the typical band"
    } else if input.current_price > profile.average_price + band {
        "above the typical band"
    } else {
        "within the typical band"
    };
    format!(
        "{month_name} fares on {} average {:.0} {} and peak near {:.0}; the current {:.0} sits {placement}.",
        input.route, profile.average_price, input.currency, profile.max_price, input.current_price
    )
}
