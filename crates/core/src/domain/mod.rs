pub mod history;
pub mod prediction;
pub mod route;

pub use history::{HistoricalPricePoint, SeasonalPeriod};
pub use prediction::{PricePrediction, PriceRange, Recommendation};
pub use route::Route;
