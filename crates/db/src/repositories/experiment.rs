use async_trait::async_trait;
use farecast_core::{AbResult, ApplicationError, ExperimentStore};
use sqlx::{sqlite::SqliteRow, Row};

use super::codec;
use crate::DbPool;

/// SQLite-backed append-only experiment log.
pub struct SqlExperimentStore {
    pool: DbPool,
}

impl SqlExperimentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn result_from_row(row: &SqliteRow) -> Result<AbResult, ApplicationError> {
        let route: String = row.try_get("route").map_err(codec::db_error)?;
        let recommendation: String = row.try_get("recommendation").map_err(codec::db_error)?;
        let recorded_at: String = row.try_get("recorded_at").map_err(codec::db_error)?;
        let user_action: Option<String> = row.try_get("user_action").map_err(codec::db_error)?;

        Ok(AbResult {
            variant_id: row.try_get("variant_id").map_err(codec::db_error)?,
            user_id: row.try_get("user_id").map_err(codec::db_error)?,
            route: codec::parse_route(&route)?,
            recommendation: codec::parse_recommendation(&recommendation)?,
            recorded_at: codec::parse_timestamp("recorded_at", &recorded_at)?,
            user_action: user_action
                .as_deref()
                .map(codec::parse_user_action)
                .transpose()?,
            success: row.try_get("success").map_err(codec::db_error)?,
            savings_estimate: row.try_get("savings_estimate").map_err(codec::db_error)?,
        })
    }
}

#[async_trait]
impl ExperimentStore for SqlExperimentStore {
    async fn append_result(&self, result: &AbResult) -> Result<(), ApplicationError> {
        sqlx::query(
            r#"
            INSERT INTO experiment_log (
                variant_id, user_id, route, recommendation, recorded_at,
                user_action, success, savings_estimate
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&result.variant_id)
        .bind(&result.user_id)
        .bind(result.route.to_string())
        .bind(codec::encode_recommendation(result.recommendation))
        .bind(codec::encode_timestamp(result.recorded_at))
        .bind(result.user_action.map(codec::encode_user_action))
        .bind(result.success)
        .bind(result.savings_estimate)
        .execute(&self.pool)
        .await
        .map_err(codec::db_error)?;

        Ok(())
    }

    async fn load_results(&self) -> Result<Vec<AbResult>, ApplicationError> {
        let rows = sqlx::query("SELECT * FROM experiment_log ORDER BY recorded_at ASC, id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(codec::db_error)?;

        rows.iter().map(Self::result_from_row).collect()
    }
}
