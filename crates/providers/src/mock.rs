//! Deterministic offline provider.

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use farecast_core::{lookup, FareObservation, FareQuery};

use crate::{CheapestFare, FareProvider, ProviderError};

/// Serves seasonal-shaped fares without touching the network.
///
/// Quotes are derived from the seasonal reference profile for the queried
/// route and month, with a spread fixed by the route and departure date, so
/// the same query always returns the same fares. Used in tests and for
/// offline runs where no real provider is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockFareProvider;

impl MockFareProvider {
    fn quote_amounts(query: &FareQuery) -> Vec<f64> {
        let profile = lookup(&query.route, query.departure_date.month()).profile;

        // A stable per-query tilt in -0.05..0.05 keeps distinct dates from
        // quoting identical fares.
        let seed = query
            .route
            .to_string()
            .bytes()
            .fold(query.departure_date.ordinal() as u64, |acc, byte| {
                acc.wrapping_mul(31).wrapping_add(u64::from(byte))
            });
        let tilt = ((seed % 100) as f64 / 100.0 - 0.5) * 0.1;

        vec![
            profile.min_price * (1.0 + tilt),
            profile.average_price * (1.0 + tilt),
            profile.max_price * (1.0 + tilt),
        ]
    }
}

#[async_trait]
impl FareProvider for MockFareProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search_prices(
        &self,
        query: &FareQuery,
    ) -> Result<Vec<FareObservation>, ProviderError> {
        let now = Utc::now();
        Ok(Self::quote_amounts(query)
            .into_iter()
            .map(|amount| FareObservation {
                amount,
                currency: query.currency.clone(),
                observed_at: now,
            })
            .collect())
    }

    async fn cheapest_or_exact(&self, query: &FareQuery) -> Result<CheapestFare, ProviderError> {
        let cheapest = Self::quote_amounts(query)
            .into_iter()
            .fold(f64::INFINITY, f64::min);
        Ok(CheapestFare { price: cheapest, is_exact: false })
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use farecast_core::FareQuery;

    use super::MockFareProvider;
    use crate::FareProvider;

    fn query(route: &str, departure: NaiveDate) -> FareQuery {
        FareQuery {
            route: route.parse().expect("route"),
            departure_date: departure,
            return_date: None,
            currency: "USD".to_string(),
            direct_only: false,
        }
    }

    #[tokio::test]
    async fn same_query_always_quotes_the_same_fares() {
        let provider = MockFareProvider;
        let q = query("LHR-JFK", NaiveDate::from_ymd_opt(2026, 7, 10).expect("date"));

        let first = provider.search_prices(&q).await.expect("quotes");
        let second = provider.search_prices(&q).await.expect("quotes");

        let first_amounts: Vec<f64> = first.iter().map(|f| f.amount).collect();
        let second_amounts: Vec<f64> = second.iter().map(|f| f.amount).collect();
        assert_eq!(first_amounts, second_amounts);
        assert_eq!(first.len(), 3);
    }

    #[tokio::test]
    async fn different_departure_dates_quote_different_fares() {
        let provider = MockFareProvider;
        let july = query("LHR-JFK", NaiveDate::from_ymd_opt(2026, 7, 10).expect("date"));
        let also_july = query("LHR-JFK", NaiveDate::from_ymd_opt(2026, 7, 11).expect("date"));

        let a = provider.search_prices(&july).await.expect("quotes");
        let b = provider.search_prices(&also_july).await.expect("quotes");

        assert_ne!(a[1].amount, b[1].amount);
    }

    #[tokio::test]
    async fn quotes_track_the_seasonal_profile() {
        let provider = MockFareProvider;
        let peak = query("LHR-JFK", NaiveDate::from_ymd_opt(2026, 7, 10).expect("date"));
        let low = query("LHR-JFK", NaiveDate::from_ymd_opt(2026, 2, 10).expect("date"));

        let peak_cheapest = provider.cheapest_or_exact(&peak).await.expect("fare");
        let low_cheapest = provider.cheapest_or_exact(&low).await.expect("fare");

        assert!(peak_cheapest.price > low_cheapest.price);
        assert!(!peak_cheapest.is_exact);
    }
}
