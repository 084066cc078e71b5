use async_trait::async_trait;
use chrono::Utc;
use farecast_core::{
    ApplicationError, BacktestResult, HistoricalPricePoint, HistoryStore, Route, ValidationResult,
};
use sqlx::{sqlite::SqliteRow, Row};

use super::codec;
use crate::DbPool;

/// SQLite-backed store for the historical series, backtest log, and the
/// single-row validation cache.
pub struct SqlHistoryStore {
    pool: DbPool,
}

impl SqlHistoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn point_from_row(row: &SqliteRow) -> Result<HistoricalPricePoint, ApplicationError> {
        let route: String = row.try_get("route").map_err(codec::db_error)?;
        let observed_at: String = row.try_get("observed_at").map_err(codec::db_error)?;
        let departure_date: String = row.try_get("departure_date").map_err(codec::db_error)?;
        let seasonal_period: String = row.try_get("seasonal_period").map_err(codec::db_error)?;

        Ok(HistoricalPricePoint {
            route: codec::parse_route(&route)?,
            price: row.try_get("price").map_err(codec::db_error)?,
            currency: row.try_get("currency").map_err(codec::db_error)?,
            observed_at: codec::parse_date("observed_at", &observed_at)?,
            departure_date: codec::parse_date("departure_date", &departure_date)?,
            booking_days_ahead: row.try_get("booking_days_ahead").map_err(codec::db_error)?,
            day_of_week: row.try_get("day_of_week").map_err(codec::db_error)?,
            month: row.try_get("month").map_err(codec::db_error)?,
            year: row.try_get("year").map_err(codec::db_error)?,
            is_weekend: row.try_get("is_weekend").map_err(codec::db_error)?,
            is_holiday: row.try_get("is_holiday").map_err(codec::db_error)?,
            seasonal_period: codec::parse_seasonal_period(&seasonal_period)?,
            from_live_quote: row.try_get("from_live_quote").map_err(codec::db_error)?,
        })
    }

    fn backtest_from_row(row: &SqliteRow) -> Result<BacktestResult, ApplicationError> {
        let route: String = row.try_get("route").map_err(codec::db_error)?;
        let prediction_date: String = row.try_get("prediction_date").map_err(codec::db_error)?;
        let recommendation: String = row.try_get("recommendation").map_err(codec::db_error)?;
        let outcome: String = row.try_get("outcome").map_err(codec::db_error)?;

        Ok(BacktestResult {
            route: codec::parse_route(&route)?,
            prediction_date: codec::parse_date("prediction_date", &prediction_date)?,
            predicted_price: row.try_get("predicted_price").map_err(codec::db_error)?,
            actual_price: row.try_get("actual_price").map_err(codec::db_error)?,
            error: row.try_get("error").map_err(codec::db_error)?,
            percentage_error: row.try_get("percentage_error").map_err(codec::db_error)?,
            recommendation: codec::parse_recommendation(&recommendation)?,
            outcome: codec::parse_outcome(&outcome)?,
            days_ahead: row.try_get("days_ahead").map_err(codec::db_error)?,
        })
    }

    fn validation_from_row(row: &SqliteRow) -> Result<ValidationResult, ApplicationError> {
        let period_start: String = row.try_get("period_start").map_err(codec::db_error)?;
        let period_end: String = row.try_get("period_end").map_err(codec::db_error)?;
        let computed_at: String = row.try_get("computed_at").map_err(codec::db_error)?;
        let sample_size: i64 = row.try_get("sample_size").map_err(codec::db_error)?;

        Ok(ValidationResult {
            accuracy: row.try_get("accuracy").map_err(codec::db_error)?,
            mean_absolute_error: row.try_get("mean_absolute_error").map_err(codec::db_error)?,
            root_mean_square_error: row
                .try_get("root_mean_square_error")
                .map_err(codec::db_error)?,
            confidence_interval: (
                row.try_get("ci_low").map_err(codec::db_error)?,
                row.try_get("ci_high").map_err(codec::db_error)?,
            ),
            sample_size: usize::try_from(sample_size)
                .map_err(|_| codec::corrupt("sample_size", &sample_size.to_string()))?,
            period_start: codec::parse_date("period_start", &period_start)?,
            period_end: codec::parse_date("period_end", &period_end)?,
            computed_at: codec::parse_timestamp("computed_at", &computed_at)?,
        })
    }
}

#[async_trait]
impl HistoryStore for SqlHistoryStore {
    async fn append(&self, points: &[HistoricalPricePoint]) -> Result<(), ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(codec::db_error)?;
        for point in points {
            sqlx::query(
                r#"
                INSERT INTO price_history (
                    route, price, currency, observed_at, departure_date,
                    booking_days_ahead, day_of_week, month, year,
                    is_weekend, is_holiday, seasonal_period, from_live_quote
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(point.route.to_string())
            .bind(point.price)
            .bind(&point.currency)
            .bind(codec::encode_date(point.observed_at))
            .bind(codec::encode_date(point.departure_date))
            .bind(point.booking_days_ahead)
            .bind(point.day_of_week)
            .bind(point.month)
            .bind(point.year)
            .bind(point.is_weekend)
            .bind(point.is_holiday)
            .bind(codec::encode_seasonal_period(point.seasonal_period))
            .bind(point.from_live_quote)
            .execute(&mut *tx)
            .await
            .map_err(codec::db_error)?;
        }
        tx.commit().await.map_err(codec::db_error)
    }

    async fn load_series(
        &self,
        route: Option<&Route>,
    ) -> Result<Vec<HistoricalPricePoint>, ApplicationError> {
        let rows = match route {
            Some(route) => {
                sqlx::query(
                    "SELECT * FROM price_history WHERE route = ? ORDER BY observed_at ASC, id ASC",
                )
                .bind(route.to_string())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT * FROM price_history ORDER BY observed_at ASC, id ASC")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(codec::db_error)?;

        rows.iter().map(Self::point_from_row).collect()
    }

    async fn append_backtests(&self, results: &[BacktestResult]) -> Result<(), ApplicationError> {
        let mut tx = self.pool.begin().await.map_err(codec::db_error)?;
        for result in results {
            sqlx::query(
                r#"
                INSERT INTO backtest_log (
                    route, prediction_date, predicted_price, actual_price,
                    error, percentage_error, recommendation, outcome, days_ahead
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(result.route.to_string())
            .bind(codec::encode_date(result.prediction_date))
            .bind(result.predicted_price)
            .bind(result.actual_price)
            .bind(result.error)
            .bind(result.percentage_error)
            .bind(codec::encode_recommendation(result.recommendation))
            .bind(codec::encode_outcome(result.outcome))
            .bind(result.days_ahead)
            .execute(&mut *tx)
            .await
            .map_err(codec::db_error)?;
        }
        tx.commit().await.map_err(codec::db_error)
    }

    async fn load_backtest_log(&self) -> Result<Vec<BacktestResult>, ApplicationError> {
        let rows = sqlx::query("SELECT * FROM backtest_log ORDER BY prediction_date ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(codec::db_error)?;

        rows.iter().map(Self::backtest_from_row).collect()
    }

    async fn save_validation(&self, result: &ValidationResult) -> Result<(), ApplicationError> {
        let sample_size = i64::try_from(result.sample_size)
            .map_err(|_| codec::corrupt("sample_size", &result.sample_size.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO validation_cache (
                id, accuracy, mean_absolute_error, root_mean_square_error,
                ci_low, ci_high, sample_size, period_start, period_end, computed_at
            ) VALUES (1, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (id) DO UPDATE SET
                accuracy = excluded.accuracy,
                mean_absolute_error = excluded.mean_absolute_error,
                root_mean_square_error = excluded.root_mean_square_error,
                ci_low = excluded.ci_low,
                ci_high = excluded.ci_high,
                sample_size = excluded.sample_size,
                period_start = excluded.period_start,
                period_end = excluded.period_end,
                computed_at = excluded.computed_at
            "#,
        )
        .bind(result.accuracy)
        .bind(result.mean_absolute_error)
        .bind(result.root_mean_square_error)
        .bind(result.confidence_interval.0)
        .bind(result.confidence_interval.1)
        .bind(sample_size)
        .bind(codec::encode_date(result.period_start))
        .bind(codec::encode_date(result.period_end))
        .bind(codec::encode_timestamp(result.computed_at))
        .execute(&self.pool)
        .await
        .map_err(codec::db_error)?;

        Ok(())
    }

    async fn load_validation(&self) -> Result<Option<ValidationResult>, ApplicationError> {
        let row = sqlx::query("SELECT * FROM validation_cache WHERE id = 1")
            .fetch_optional(&self.pool)
            .await
            .map_err(codec::db_error)?;

        let Some(row) = row else { return Ok(None) };
        let result = Self::validation_from_row(&row)?;

        // Stale entries stay in the table but are invisible to callers; the
        // next save overwrites them.
        if result.is_fresh(Utc::now()) {
            Ok(Some(result))
        } else {
            Ok(None)
        }
    }
}
