//! Per-phase statistics recording
//!
//! Each pipeline phase appends timing rows so slow imports can be broken
//! down after the fact. Failures to record a statistic are logged and
//! swallowed: bookkeeping must never fail a running import.

use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::features::imports::types::ProcessingPhase;

/// Append one statistics row for a job.
pub async fn record(
    pool: &PgPool,
    job_id: Uuid,
    phase: ProcessingPhase,
    operation_type: &str,
    records_count: i32,
    execution_time_ms: i64,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO import_statistics
            (job_id, processing_phase, operation_type, records_count, execution_time_ms)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(job_id)
    .bind(phase)
    .bind(operation_type)
    .bind(records_count)
    .bind(execution_time_ms)
    .execute(pool)
    .await;

    if let Err(e) = result {
        warn!(%job_id, ?phase, operation_type, error = %e, "failed to record import statistic");
    }
}
