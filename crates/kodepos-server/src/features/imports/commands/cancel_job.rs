use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::imports::types::JobStatus;

/// Request cancellation of a running import.
///
/// Cancellation is cooperative: this flips the job's status, and the
/// pipeline stops at its next batch boundary. A job already in a terminal
/// state is left untouched and the call reports `cancelled: false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelImportJobCommand {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelImportJobResponse {
    pub job_id: Uuid,
    /// Whether this call changed the job's state.
    pub cancelled: bool,
    /// Status after the call.
    pub status: JobStatus,
}

#[derive(Debug, thiserror::Error)]
pub enum CancelImportJobError {
    #[error("Import job {0} not found")]
    NotFound(Uuid),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<CancelImportJobResponse, CancelImportJobError>> for CancelImportJobCommand {}

#[tracing::instrument(skip(pool), fields(job_id = %command.job_id))]
pub async fn handle(
    pool: PgPool,
    command: CancelImportJobCommand,
) -> Result<CancelImportJobResponse, CancelImportJobError> {
    let cancelled = sqlx::query(
        r#"
        UPDATE import_jobs
        SET status = 'cancelled', completed_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')
        "#,
    )
    .bind(command.job_id)
    .execute(&pool)
    .await?
    .rows_affected()
        > 0;

    let status = sqlx::query_scalar::<_, JobStatus>(
        "SELECT status FROM import_jobs WHERE id = $1",
    )
    .bind(command.job_id)
    .fetch_optional(&pool)
    .await?
    .ok_or(CancelImportJobError::NotFound(command.job_id))?;

    if cancelled {
        tracing::info!(job_id = %command.job_id, "import job cancelled");
    } else {
        tracing::debug!(job_id = %command.job_id, %status, "cancel was a no-op; job already terminal");
    }

    Ok(CancelImportJobResponse {
        job_id: command.job_id,
        cancelled,
        status,
    })
}
