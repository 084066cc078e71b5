pub mod aggregate;
pub mod config;
pub mod domain;
pub mod errors;
pub mod experiment;
pub mod model;
pub mod seasonal;
pub mod stores;
pub mod validation;

pub use aggregate::{aggregate, AggregatedPrice, FareObservation, DEFAULT_FALLBACK_PRICE};
pub use domain::{
    HistoricalPricePoint, PricePrediction, PriceRange, Recommendation, Route, SeasonalPeriod,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use experiment::{
    apply_variant, assign, compute_metrics, winning_variant, AbMetrics, AbResult, AbVariant,
    ExperimentEngine, UserAction, VariantMode, WinningVariant, VARIANTS,
};
pub use model::{ModelConfig, ModelVariant, PredictionInput, PriceModel, Strictness};
pub use seasonal::{curated_routes, lookup, ProfileLookup, ProfileSource, RouteSeasonalProfile};
pub use stores::{ExperimentStore, FareQuery, HistoryStore, QuoteSource};
pub use validation::{
    backtest, collect, synthetic_price, validate, BacktestOutcome, BacktestResult,
    CollectorConfig, ValidationResult, BOOKING_OFFSETS_DAYS, VALIDATION_TTL_HOURS,
};
