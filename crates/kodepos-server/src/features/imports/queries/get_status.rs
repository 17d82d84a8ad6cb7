use chrono::Utc;
use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::features::imports::types::{ImportConfiguration, ImportJob, ImportValidationResult};

/// How many per-record failures to return with a status snapshot. The full
/// set stays queryable in the database.
const VALIDATION_FAILURE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetJobStatusQuery {
    pub job_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStatusResponse {
    #[serde(flatten)]
    pub job: ImportJob,
    pub progress_percentage: f64,
    /// Naive throughput-based estimate; absent while nothing has been
    /// processed or once the job is terminal.
    pub estimated_remaining_ms: Option<i64>,
    pub configuration: Option<ImportConfiguration>,
    pub validation_failures: Vec<ImportValidationResult>,
}

#[derive(Debug, thiserror::Error)]
pub enum GetJobStatusError {
    #[error("Import job {0} not found")]
    NotFound(Uuid),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Request<Result<JobStatusResponse, GetJobStatusError>> for GetJobStatusQuery {}

#[tracing::instrument(skip(pool), fields(job_id = %query.job_id))]
pub async fn handle(
    pool: PgPool,
    query: GetJobStatusQuery,
) -> Result<JobStatusResponse, GetJobStatusError> {
    let job = sqlx::query_as::<_, ImportJob>("SELECT * FROM import_jobs WHERE id = $1")
        .bind(query.job_id)
        .fetch_optional(&pool)
        .await?
        .ok_or(GetJobStatusError::NotFound(query.job_id))?;

    let configuration = sqlx::query_as::<_, ImportConfiguration>(
        r#"
        SELECT duplicate_strategy, batch_size, validate_coordinates,
               skip_invalid_records, notification_email, custom_rules
        FROM import_configurations
        WHERE job_id = $1
        "#,
    )
    .bind(query.job_id)
    .fetch_optional(&pool)
    .await?;

    let validation_failures = sqlx::query_as::<_, ImportValidationResult>(
        r#"
        SELECT * FROM import_validation_results
        WHERE job_id = $1
        ORDER BY row_number
        LIMIT $2
        "#,
    )
    .bind(query.job_id)
    .bind(VALIDATION_FAILURE_LIMIT)
    .fetch_all(&pool)
    .await?;

    let progress_percentage = job.progress_percentage();
    let estimated_remaining_ms = if job.status.is_terminal() {
        None
    } else {
        job.estimated_remaining_ms(Utc::now())
    };

    Ok(JobStatusResponse {
        job,
        progress_percentage,
        estimated_remaining_ms,
        configuration,
        validation_failures,
    })
}
