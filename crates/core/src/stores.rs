//! Persistence and collaborator seams.
//!
//! The engine never touches storage or the network directly: historical
//! data, validation caches, experiment logs, and live fare quotes all come
//! through these traits, injected at construction time. Production wires
//! SQLite repositories and the provider chain; tests wire in-memory fakes.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::aggregate::FareObservation;
use crate::domain::{HistoricalPricePoint, Route};
use crate::errors::ApplicationError;
use crate::experiment::AbResult;
use crate::validation::{BacktestResult, ValidationResult};

/// One fare request as passed to the provider capability.
#[derive(Clone, Debug, PartialEq)]
pub struct FareQuery {
    pub route: Route,
    pub departure_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub currency: String,
    pub direct_only: bool,
}

/// The single capability all real-quote providers sit behind.
///
/// Implementations absorb provider failures: an exhausted fallback chain
/// yields an empty result, never an error, so provider outages degrade to
/// synthetic data instead of propagating.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// All quotes the providers produced for this query; empty on total
    /// failure.
    async fn search(&self, query: &FareQuery) -> Vec<FareObservation>;

    /// Best single fare for this query, if any provider answered.
    async fn cheapest(&self, query: &FareQuery) -> Option<f64>;
}

/// Durable store for the historical series, backtest log, and validation
/// cache. Appends must be serialized by the implementation; readers may see
/// a slightly stale snapshot.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn append(&self, points: &[HistoricalPricePoint]) -> Result<(), ApplicationError>;

    async fn load_series(
        &self,
        route: Option<&Route>,
    ) -> Result<Vec<HistoricalPricePoint>, ApplicationError>;

    async fn append_backtests(&self, results: &[BacktestResult]) -> Result<(), ApplicationError>;

    async fn load_backtest_log(&self) -> Result<Vec<BacktestResult>, ApplicationError>;

    async fn save_validation(&self, result: &ValidationResult) -> Result<(), ApplicationError>;

    /// The cached validation result, or `None` when absent or stale.
    async fn load_validation(&self) -> Result<Option<ValidationResult>, ApplicationError>;
}

/// Append-only log for A/B experiment rows.
#[async_trait]
pub trait ExperimentStore: Send + Sync {
    async fn append_result(&self, result: &AbResult) -> Result<(), ApplicationError>;

    async fn load_results(&self) -> Result<Vec<AbResult>, ApplicationError>;
}
