//! Kiwi-style search client (GET with an API-key header and its own
//! parameter vocabulary).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use farecast_core::{FareObservation, FareQuery};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{CheapestFare, FareProvider, ProviderError};

pub struct KiwiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl KiwiClient {
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

    async fn fetch_itineraries(
        &self,
        query: &FareQuery,
    ) -> Result<SearchResponse, ProviderError> {
        let date = query.departure_date.format("%d/%m/%Y").to_string();
        let mut params = vec![
            ("fly_from", query.route.origin().to_string()),
            ("fly_to", query.route.destination().to_string()),
            ("date_from", date.clone()),
            ("date_to", date),
            ("curr", query.currency.clone()),
            ("limit", "10".to_string()),
        ];
        if let Some(return_date) = query.return_date {
            let formatted = return_date.format("%d/%m/%Y").to_string();
            params.push(("return_from", formatted.clone()));
            params.push(("return_to", formatted));
        }
        if query.direct_only {
            params.push(("max_stopovers", "0".to_string()));
        }

        let response = self
            .http
            .get(format!("{}/v2/search", self.base_url))
            .header("apikey", self.api_key.expose_secret())
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<SearchResponse>()
            .await
            .map_err(|error| ProviderError::Decode(error.to_string()))
    }
}

#[async_trait]
impl FareProvider for KiwiClient {
    fn name(&self) -> &'static str {
        "kiwi"
    }

    async fn search_prices(
        &self,
        query: &FareQuery,
    ) -> Result<Vec<FareObservation>, ProviderError> {
        let search = self.fetch_itineraries(query).await?;
        let now = Utc::now();
        let quotes: Vec<FareObservation> = search
            .data
            .iter()
            .map(|itinerary| FareObservation {
                amount: itinerary.price,
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
        Ok(CheapestFare { price, is_exact: true })
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Itinerary>,
}

#[derive(Debug, Deserialize)]
struct Itinerary {
    price: f64,
}

#[cfg(test)]
mod tests {
    use super::SearchResponse;

    #[test]
    fn decodes_itinerary_prices() {
        let payload = r#"{
            "data": [
                {"price": 512.0, "deep_link": "https://example.test/a"},
                {"price": 498.5}
            ],
            "currency": "USD"
        }"#;

        let response: SearchResponse = serde_json::from_str(payload).expect("decode");
        let prices: Vec<f64> = response.data.iter().map(|i| i.price).collect();

        assert_eq!(prices, vec![512.0, 498.5]);
    }

    #[test]
    fn empty_body_decodes_as_no_itineraries() {
        let response: SearchResponse = serde_json::from_str("{}").expect("decode");
        assert!(response.data.is_empty());
    }
}
