use chrono::{DateTime, Utc};
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Aggregate statistics across all import jobs.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GetSystemStatsQuery {}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SystemStatsResponse {
    pub total_jobs: i64,
    pub completed_jobs: i64,
    pub failed_jobs: i64,
    pub cancelled_jobs: i64,
    /// Jobs still moving through the pipeline.
    pub active_jobs: i64,
    pub total_records_imported: i64,
    pub total_duplicates_skipped: i64,
    /// Mean wall-clock time of completed jobs; absent until one completes.
    pub average_processing_time_ms: Option<f64>,
    pub last_completed_at: Option<DateTime<Utc>>,
    /// Current size of the postal-code store.
    #[sqlx(default)]
    pub total_postal_codes: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum GetSystemStatsError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<SystemStatsResponse, GetSystemStatsError>> for GetSystemStatsQuery {}

#[tracing::instrument(skip(pool, _query))]
pub async fn handle(
    pool: PgPool,
    _query: GetSystemStatsQuery,
) -> Result<SystemStatsResponse, GetSystemStatsError> {
    let mut stats = sqlx::query_as::<_, SystemStatsResponse>(
        r#"
        SELECT
            COUNT(*)                                                    AS total_jobs,
            COUNT(*) FILTER (WHERE status = 'completed')                AS completed_jobs,
            COUNT(*) FILTER (WHERE status = 'failed')                   AS failed_jobs,
            COUNT(*) FILTER (WHERE status = 'cancelled')                AS cancelled_jobs,
            COUNT(*) FILTER (WHERE status NOT IN
                ('completed', 'failed', 'cancelled'))                   AS active_jobs,
            COALESCE(SUM(successful_records), 0)::BIGINT                AS total_records_imported,
            COALESCE(SUM(duplicate_records), 0)::BIGINT                 AS total_duplicates_skipped,
            (AVG(processing_time_ms) FILTER
                (WHERE status = 'completed'))::DOUBLE PRECISION         AS average_processing_time_ms,
            MAX(completed_at) FILTER (WHERE status = 'completed')       AS last_completed_at
        FROM import_jobs
        "#,
    )
    .fetch_one(&pool)
    .await?;

    stats.total_postal_codes = crate::db::postal_codes::count_records(&pool).await?;

    Ok(stats)
}
