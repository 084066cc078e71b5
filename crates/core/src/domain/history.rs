use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::route::Route;

/// Coarse demand season a calendar date falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalPeriod {
    Low,
    Shoulder,
    Peak,
}

impl SeasonalPeriod {
    pub fn for_month(month: u32) -> Self {
        match month {
            6..=8 | 12 => Self::Peak,
            4 | 5 | 9 | 10 => Self::Shoulder,
            _ => Self::Low,
        }
    }
}

/// One observed or synthesized price sample in the historical series.
///
/// Points are append-only: once recorded they are never mutated, and the
/// validator treats the series as an immutable replay log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPricePoint {
    pub route: Route,
    pub price: f64,
    pub currency: String,
    pub observed_at: NaiveDate,
    pub departure_date: NaiveDate,
    /// Days between observation and departure (the booking window).
    pub booking_days_ahead: i64,
    /// ISO weekday of the departure, 1 = Monday .. 7 = Sunday.
    pub day_of_week: u32,
    pub month: u32,
    pub year: i32,
    pub is_weekend: bool,
    pub is_holiday: bool,
    pub seasonal_period: SeasonalPeriod,
    /// False for synthetic fallback samples generated when no provider quote
    /// was available.
    pub from_live_quote: bool,
}

impl HistoricalPricePoint {
    pub fn observed(
        route: Route,
        price: f64,
        currency: impl Into<String>,
        observed_at: NaiveDate,
        departure_date: NaiveDate,
        from_live_quote: bool,
    ) -> Self {
        let day_of_week = departure_date.weekday().number_from_monday();
        Self {
            price,
            currency: currency.into(),
            observed_at,
            departure_date,
            booking_days_ahead: (departure_date - observed_at).num_days(),
            day_of_week,
            month: departure_date.month(),
            year: departure_date.year(),
            is_weekend: day_of_week >= 6,
            is_holiday: is_holiday_period(departure_date),
            seasonal_period: SeasonalPeriod::for_month(departure_date.month()),
            route,
            from_live_quote,
        }
    }
}

/// Year-end travel crunch is the one holiday window modeled explicitly; the
/// seasonal table already absorbs the rest.
fn is_holiday_period(date: NaiveDate) -> bool {
    (date.month() == 12 && date.day() >= 20) || (date.month() == 1 && date.day() <= 5)
}
