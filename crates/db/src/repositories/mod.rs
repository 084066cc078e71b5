pub mod experiment;
pub mod history;

pub use experiment::SqlExperimentStore;
pub use history::SqlHistoryStore;

pub(crate) mod codec {
    //! Column encodings shared by the repositories.
    //!
    //! Dates are stored as `YYYY-MM-DD` text, timestamps as RFC 3339 text,
    //! and enums as their snake_case names. Decode failures surface as
    //! persistence errors since they mean the stored data is corrupt.

    use chrono::{DateTime, NaiveDate, Utc};
    use farecast_core::{
        ApplicationError, BacktestOutcome, Recommendation, Route, SeasonalPeriod, UserAction,
    };

    pub fn db_error(error: sqlx::Error) -> ApplicationError {
        ApplicationError::Persistence(format!("database error: {error}"))
    }

    pub fn corrupt(field: &str, value: &str) -> ApplicationError {
        ApplicationError::Persistence(format!("invalid stored value for {field}: `{value}`"))
    }

    pub fn encode_date(date: NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate, ApplicationError> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| corrupt(field, value))
    }

    pub fn encode_timestamp(timestamp: DateTime<Utc>) -> String {
        timestamp.to_rfc3339()
    }

    pub fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<Utc>, ApplicationError> {
        DateTime::parse_from_rfc3339(value)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|_| corrupt(field, value))
    }

    pub fn parse_route(value: &str) -> Result<Route, ApplicationError> {
        value.parse().map_err(|_| corrupt("route", value))
    }

    pub fn encode_seasonal_period(period: SeasonalPeriod) -> &'static str {
        match period {
            SeasonalPeriod::Low => "low",
            SeasonalPeriod::Shoulder => "shoulder",
            SeasonalPeriod::Peak => "peak",
        }
    }

    pub fn parse_seasonal_period(value: &str) -> Result<SeasonalPeriod, ApplicationError> {
        match value {
            "low" => Ok(SeasonalPeriod::Low),
            "shoulder" => Ok(SeasonalPeriod::Shoulder),
            "peak" => Ok(SeasonalPeriod::Peak),
            other => Err(corrupt("seasonal_period", other)),
        }
    }

    pub fn encode_recommendation(recommendation: Recommendation) -> &'static str {
        match recommendation {
            Recommendation::BuyNow => "buy_now",
            Recommendation::Wait => "wait",
        }
    }

    pub fn parse_recommendation(value: &str) -> Result<Recommendation, ApplicationError> {
        match value {
            "buy_now" => Ok(Recommendation::BuyNow),
            "wait" => Ok(Recommendation::Wait),
            other => Err(corrupt("recommendation", other)),
        }
    }

    pub fn encode_outcome(outcome: BacktestOutcome) -> &'static str {
        match outcome {
            BacktestOutcome::Correct => "correct",
            BacktestOutcome::Incorrect => "incorrect",
        }
    }

    pub fn parse_outcome(value: &str) -> Result<BacktestOutcome, ApplicationError> {
        match value {
            "correct" => Ok(BacktestOutcome::Correct),
            "incorrect" => Ok(BacktestOutcome::Incorrect),
            other => Err(corrupt("outcome", other)),
        }
    }

    pub fn encode_user_action(action: UserAction) -> &'static str {
        match action {
            UserAction::Followed => "followed",
            UserAction::Ignored => "ignored",
        }
    }

    pub fn parse_user_action(value: &str) -> Result<UserAction, ApplicationError> {
        match value {
            "followed" => Ok(UserAction::Followed),
            "ignored" => Ok(UserAction::Ignored),
            other => Err(corrupt("user_action", other)),
        }
    }
}
