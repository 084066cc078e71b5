//! Real-quote provider integrations.
//!
//! Three external pricing APIs hide behind one `FareProvider` trait, and the
//! engine only ever sees the `ProviderChain`, which tries each enabled
//! provider in order, logs failures, and never propagates them. Adding a
//! provider means implementing the trait, not copying a fetch/parse block.

pub mod amadeus;
pub mod chain;
pub mod kiwi;
pub mod mock;
pub mod skylink;

use async_trait::async_trait;
use farecast_core::{FareObservation, FareQuery};
use thiserror::Error;

pub use amadeus::AmadeusClient;
pub use chain::ProviderChain;
pub use kiwi::KiwiClient;
pub use mock::MockFareProvider;
pub use skylink::SkylinkClient;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("response could not be decoded: {0}")]
    Decode(String),
    #[error("provider returned no fares")]
    NoData,
    #[error("provider is not configured with credentials")]
    MissingCredentials,
}

/// Best single fare a provider can offer for a query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CheapestFare {
    pub price: f64,
    /// True when the fare quotes the exact requested itinerary rather than
    /// a nearby-date or estimated price.
    pub is_exact: bool,
}

/// One external pricing API.
#[async_trait]
pub trait FareProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search_prices(
        &self,
        query: &FareQuery,
    ) -> Result<Vec<FareObservation>, ProviderError>;

    async fn cheapest_or_exact(&self, query: &FareQuery) -> Result<CheapestFare, ProviderError>;
}
