//! Ordered provider fallback.

use std::sync::Arc;

use async_trait::async_trait;
use farecast_core::config::{ProviderConfig, ProvidersConfig};
use farecast_core::{FareObservation, FareQuery, QuoteSource};
use tracing::{debug, info, warn};

use crate::{
    AmadeusClient, FareProvider, KiwiClient, MockFareProvider, ProviderError, SkylinkClient,
};

/// Tries each provider in configuration order and absorbs every failure.
///
/// This is the only `QuoteSource` the engine sees: an exhausted chain means
/// an empty search result or no cheapest fare, never an error, so callers
/// degrade to synthetic data instead of handling provider exceptions.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn FareProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn FareProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|provider| provider.name()).collect()
    }

    /// Build the chain from configuration: enabled providers join in fixed
    /// configuration order, and an instance with no real provider serves
    /// deterministic mock quotes instead of failing.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        let timeout = config.request_timeout_secs;
        let mut providers: Vec<Arc<dyn FareProvider>> = Vec::new();

        if let Some(key) = enabled_key(&config.amadeus) {
            providers.push(Arc::new(AmadeusClient::new(
                config.amadeus.base_url.clone(),
                key,
                timeout,
            )?));
        }
        if let Some(key) = enabled_key(&config.skylink) {
            providers.push(Arc::new(SkylinkClient::new(
                config.skylink.base_url.clone(),
                key,
                timeout,
            )?));
        }
        if let Some(key) = enabled_key(&config.kiwi) {
            providers.push(Arc::new(KiwiClient::new(config.kiwi.base_url.clone(), key, timeout)?));
        }

        if providers.is_empty() {
            info!("no real provider enabled, serving deterministic mock quotes");
            providers.push(Arc::new(MockFareProvider));
        }

        Ok(Self::new(providers))
    }
}

fn enabled_key(provider: &ProviderConfig) -> Option<secrecy::SecretString> {
    if provider.enabled {
        provider.api_key.clone()
    } else {
        None
    }
}

#[async_trait]
impl QuoteSource for ProviderChain {
    async fn search(&self, query: &FareQuery) -> Vec<FareObservation> {
        for provider in &self.providers {
            match provider.search_prices(query).await {
                Ok(quotes) if !quotes.is_empty() => {
                    debug!(
                        provider = provider.name(),
                        route = %query.route,
                        quote_count = quotes.len(),
                        "provider search succeeded"
                    );
                    return quotes;
                }
                Ok(_) => {
                    debug!(provider = provider.name(), route = %query.route, "provider returned no fares");
                }
                Err(error) => {
                    warn!(
                        provider = provider.name(),
                        route = %query.route,
                        error = %error,
                        "provider search failed, trying next"
                    );
                }
            }
        }
        Vec::new()
    }

    async fn cheapest(&self, query: &FareQuery) -> Option<f64> {
        for provider in &self.providers {
            match provider.cheapest_or_exact(query).await {
                Ok(fare) => return Some(fare.price),
                Err(error) => {
                    warn!(
                        provider = provider.name(),
                        route = %query.route,
                        error = %error,
                        "provider cheapest lookup failed, trying next"
                    );
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::{NaiveDate, Utc};
    use farecast_core::{FareObservation, FareQuery, QuoteSource};

    use super::ProviderChain;
    use crate::{CheapestFare, FareProvider, ProviderError};

    struct FailingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl FareProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn search_prices(
            &self,
            _query: &FareQuery,
        ) -> Result<Vec<FareObservation>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::NoData)
        }

        async fn cheapest_or_exact(
            &self,
            _query: &FareQuery,
        ) -> Result<CheapestFare, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::MissingCredentials)
        }
    }

    struct FixedProvider {
        price: f64,
    }

    #[async_trait]
    impl FareProvider for FixedProvider {
        fn name(&self) -> &'static str {
            "fixed"
        }

        async fn search_prices(
            &self,
            query: &FareQuery,
        ) -> Result<Vec<FareObservation>, ProviderError> {
            Ok(vec![FareObservation {
                amount: self.price,
                currency: query.currency.clone(),
                observed_at: Utc::now(),
            }])
        }

        async fn cheapest_or_exact(
            &self,
            _query: &FareQuery,
        ) -> Result<CheapestFare, ProviderError> {
            Ok(CheapestFare { price: self.price, is_exact: true })
        }
    }

    fn query() -> FareQuery {
        FareQuery {
            route: "LHR-JFK".parse().expect("route"),
            departure_date: NaiveDate::from_ymd_opt(2026, 7, 10).expect("date"),
            return_date: None,
            currency: "USD".to_string(),
            direct_only: false,
        }
    }

    #[tokio::test]
    async fn chain_falls_through_failures_to_the_next_provider() {
        let failing = Arc::new(FailingProvider { calls: AtomicUsize::new(0) });
        let chain = ProviderChain::new(vec![
            failing.clone(),
            Arc::new(FixedProvider { price: 702.0 }),
        ]);

        let cheapest = chain.cheapest(&query()).await;

        assert_eq!(cheapest, Some(702.0));
        assert_eq!(failing.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_chain_yields_empty_results_not_errors() {
        let chain = ProviderChain::new(vec![
            Arc::new(FailingProvider { calls: AtomicUsize::new(0) }),
            Arc::new(FailingProvider { calls: AtomicUsize::new(0) }),
        ]);

        assert!(chain.search(&query()).await.is_empty());
        assert_eq!(chain.cheapest(&query()).await, None);
    }

    #[tokio::test]
    async fn first_successful_provider_short_circuits_the_chain() {
        let second = Arc::new(FailingProvider { calls: AtomicUsize::new(0) });
        let chain = ProviderChain::new(vec![
            Arc::new(FixedProvider { price: 650.0 }),
            second.clone(),
        ]);

        let quotes = chain.search(&query()).await;

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].amount, 650.0);
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unconfigured_chain_falls_back_to_the_mock_provider() {
        let disabled = farecast_core::config::ProviderConfig {
            enabled: false,
            base_url: String::new(),
            api_key: None,
        };
        let config = farecast_core::config::ProvidersConfig {
            amadeus: disabled.clone(),
            skylink: disabled.clone(),
            kiwi: disabled,
            request_timeout_secs: 10,
        };

        let chain = ProviderChain::from_config(&config).expect("chain");
        assert_eq!(chain.provider_names(), vec!["mock"]);
    }

    #[tokio::test]
    async fn empty_chain_reports_itself() {
        let chain = ProviderChain::default();
        assert!(chain.is_empty());
        assert!(chain.search(&query()).await.is_empty());
    }
}
