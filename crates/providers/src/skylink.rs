//! Skylink-style quote search client (GET with query-string parameters).

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use farecast_core::{FareObservation, FareQuery};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{CheapestFare, FareProvider, ProviderError};

pub struct SkylinkClient {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl SkylinkClient {
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

    async fn fetch_quotes(&self, query: &FareQuery) -> Result<QuoteResponse, ProviderError> {
        let departure = query.departure_date.format("%Y-%m-%d").to_string();
        let mut params = vec![
            ("origin", query.route.origin().to_string()),
            ("destination", query.route.destination().to_string()),
            ("outboundDate", departure),
            ("currency", query.currency.clone()),
            ("apiKey", self.api_key.expose_secret().to_string()),
        ];
        if let Some(return_date) = query.return_date {
            params.push(("inboundDate", return_date.format("%Y-%m-%d").to_string()));
        }
        if query.direct_only {
            params.push(("directOnly", "true".to_string()));
        }

        let response = self
            .http
            .get(format!("{}/v1/quotes", self.base_url))
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        response
            .json::<QuoteResponse>()
            .await
            .map_err(|error| ProviderError::Decode(error.to_string()))
    }
}

#[async_trait]
impl FareProvider for SkylinkClient {
    fn name(&self) -> &'static str {
        "skylink"
    }

    async fn search_prices(
        &self,
        query: &FareQuery,
    ) -> Result<Vec<FareObservation>, ProviderError> {
        let quotes = self.fetch_quotes(query).await?;
        let now = Utc::now();
        let observations: Vec<FareObservation> = quotes
            .quotes
            .iter()
            .map(|quote| FareObservation {
                amount: quote.min_price,
                currency: query.currency.clone(),
                observed_at: now,
            })
            .collect();
        if observations.is_empty() {
            return Err(ProviderError::NoData);
        }
        Ok(observations)
    }

    async fn cheapest_or_exact(&self, query: &FareQuery) -> Result<CheapestFare, ProviderError> {
        let quotes = self.fetch_quotes(query).await?;
        let best = quotes
            .quotes
            .iter()
            .min_by(|a, b| a.min_price.total_cmp(&b.min_price))
            .ok_or(ProviderError::NoData)?;
        // Cached quotes may refer to nearby dates; the API flags exact ones.
        Ok(CheapestFare { price: best.min_price, is_exact: best.direct })
    }
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "Quotes", default)]
    quotes: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    #[serde(rename = "MinPrice")]
    min_price: f64,
    #[serde(rename = "Direct", default)]
    direct: bool,
}

#[cfg(test)]
mod tests {
    use super::QuoteResponse;

    #[test]
    fn decodes_quote_list_with_pascal_case_keys() {
        let payload = r#"{
            "Quotes": [
                {"MinPrice": 455.0, "Direct": true, "QuoteDateTime": "2026-06-01T09:00:00"},
                {"MinPrice": 430.0, "Direct": false}
            ]
        }"#;

        let response: QuoteResponse = serde_json::from_str(payload).expect("decode");

        assert_eq!(response.quotes.len(), 2);
        assert_eq!(response.quotes[0].min_price, 455.0);
        assert!(response.quotes[0].direct);
        assert!(!response.quotes[1].direct);
    }

    #[test]
    fn empty_body_decodes_as_no_quotes() {
        let response: QuoteResponse = serde_json::from_str("{}").expect("decode");
        assert!(response.quotes.is_empty());
    }
}
