//! Amadeus-style flight offers client.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use farecast_core::{FareObservation, FareQuery};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use crate::{CheapestFare, FareProvider, ProviderError};

pub struct AmadeusClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl AmadeusClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { http, base_url: base_url.into(), api_key })
    }

    async fn fetch_offers(&self, query: &FareQuery) -> Result<OffersResponse, ProviderError> {
        let mut body = json!({
            "originLocationCode": query.route.origin(),
            "destinationLocationCode": query.route.destination(),
            "departureDate": query.departure_date.format("%Y-%m-%d").to_string(),
            "currencyCode": query.currency,
            "nonStop": query.direct_only,
            "max": 10,
        });
        if let Some(return_date) = query.return_date {
            body["returnDate"] = json!(return_date.format("%Y-%m-%d").to_string());
        }

        let response = self
            .http
            .post(format!("{}/shopping/flight-offers", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<OffersResponse>()
            .await
            .map_err(|error| ProviderError::Decode(error.to_string()))
    }
}

#[async_trait]
impl FareProvider for AmadeusClient {
    fn name(&self) -> &'static str {
        "amadeus"
    }

    async fn search_prices(
        &self,
        query: &FareQuery,
    ) -> Result<Vec<FareObservation>, ProviderError> {
        let offers = self.fetch_offers(query).await?;
        let now = Utc::now();
        let quotes: Vec<FareObservation> = offers
            .data
            .iter()
            .filter_map(|offer| offer.total_amount())
            .map(|amount| FareObservation {
                amount,
                currency: query.currency.clone(),
                observed_at: now,
            })
            .collect();
        if quotes.is_empty() {
            return Err(ProviderError::NoData);
        }
        Ok(quotes)
    }

    async fn cheapest_or_exact(&self, query: &FareQuery) -> Result<CheapestFare, ProviderError> {
        let quotes = self.search_prices(query).await?;
        let price = quotes.iter().map(|q| q.amount).fold(f64::INFINITY, f64::min);
        // Flight-offer results quote the exact requested itinerary.
        Ok(CheapestFare { price, is_exact: true })
    }
}

#[derive(Debug, Deserialize)]
struct OffersResponse {
    #[serde(default)]
    data: Vec<Offer>,
}

#[derive(Debug, Deserialize)]
struct Offer {
    price: OfferPrice,
}

impl Offer {
    /// Totals arrive as decimal strings; unparsable entries are skipped.
    fn total_amount(&self) -> Option<f64> {
        self.price.total.parse().ok()
    }
}

#[derive(Debug, Deserialize)]
struct OfferPrice {
    total: String,
}

#[cfg(test)]
mod tests {
    use super::OffersResponse;

    #[test]
    fn decodes_offer_totals_from_decimal_strings() {
        let payload = r#"{
            "data": [
                {"price": {"total": "712.40", "currency": "USD"}},
                {"price": {"total": "689.00", "currency": "USD"}},
                {"price": {"total": "not-a-number"}}
            ]
        }"#;

        let response: OffersResponse = serde_json::from_str(payload).expect("decode");
        let amounts: Vec<f64> =
            response.data.iter().filter_map(|offer| offer.total_amount()).collect();

        assert_eq!(amounts, vec![712.40, 689.00]);
    }

    #[test]
    fn missing_data_array_decodes_as_empty() {
        let response: OffersResponse = serde_json::from_str("{}").expect("decode");
        assert!(response.data.is_empty());
    }
}
