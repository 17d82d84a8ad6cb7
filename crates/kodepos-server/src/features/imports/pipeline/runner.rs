//! Import job driver
//!
//! Walks a pending job through the processing phases: parse, validate,
//! transform, insert in batches, finalize. The job row is the single
//! source of truth for progress; counters are updated after every batch
//! so a concurrent status poll always sees a consistent snapshot.
//!
//! Cancellation is cooperative. The cancel endpoint flips the status row;
//! the driver notices at the next phase transition or batch boundary and
//! stops. The batch in flight always runs to completion.

use std::time::Instant;

use serde_json::Value;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::postal_codes::PostalRecord;
use crate::features::imports::pipeline::inserter::{self, ResolvedRecord};
use crate::features::imports::pipeline::normalizer::{self, CandidateRecord};
use crate::features::imports::pipeline::parser::{self, RowPayload};
use crate::features::imports::pipeline::{resolver, stats, validator};
use crate::features::imports::types::{
    ImportConfiguration, ImportJob, JobStatus, ProcessingPhase, Severity,
};

/// Errors from driving a job
#[derive(Debug, Error)]
pub enum RunJobError {
    #[error("Import job {0} not found")]
    JobNotFound(Uuid),

    #[error("Import job {0} is '{1}' and cannot be started")]
    NotStartable(Uuid, JobStatus),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Run a pending job to a terminal state and return its final row.
///
/// Every outcome other than infrastructure failure is expressed through
/// the job row itself: parse failures and validation failures end the job
/// as `failed` with an error message, cancellation leaves it `cancelled`,
/// success leaves it `completed`.
pub async fn run_job(pool: &PgPool, job_id: Uuid, content: &str) -> Result<ImportJob, RunJobError> {
    let timer = Instant::now();

    if !mark_started(pool, job_id).await? {
        let job = load_job(pool, job_id).await?;
        return Err(RunJobError::NotStartable(job_id, job.status));
    }
    let job = load_job(pool, job_id).await?;
    let config = load_configuration(pool, job_id).await?;
    info!(%job_id, filename = %job.filename, "import started");

    let rows = match parser::parse_payload(content, job.content_type) {
        Ok(rows) => rows,
        Err(e) => {
            fail_job(pool, job_id, &e.to_string(), &timer).await?;
            return load_job(pool, job_id).await;
        },
    };
    let total = rows.len() as i32;
    sqlx::query("UPDATE import_jobs SET total_records = $2, updated_at = NOW() WHERE id = $1")
        .bind(job_id)
        .bind(total)
        .execute(pool)
        .await?;

    // Validation phase
    if !advance(pool, job_id, JobStatus::Validating).await? {
        return finish_interrupted(pool, job_id, &timer).await;
    }
    let phase_timer = Instant::now();
    let mut candidates: Vec<(i32, CandidateRecord)> = Vec::new();
    let mut invalid = 0i32;
    for row in &rows {
        match &row.payload {
            RowPayload::Malformed { raw, reason } => {
                record_invalid(pool, job_id, row.row_number, raw.clone(), &[reason.clone()])
                    .await?;
                invalid += 1;
            },
            RowPayload::Record(map) => {
                let candidate = normalizer::normalize(map);
                let failures = validator::validate(&candidate, config.validate_coordinates);
                if failures.is_empty() {
                    candidates.push((row.row_number, candidate));
                } else {
                    record_invalid(
                        pool,
                        job_id,
                        row.row_number,
                        Value::Object(map.clone()),
                        &failures,
                    )
                    .await?;
                    invalid += 1;
                }
            },
        }
    }
    stats::record(
        pool,
        job_id,
        ProcessingPhase::Validation,
        "validate",
        total,
        phase_timer.elapsed().as_millis() as i64,
    )
    .await;

    if invalid > 0 && !config.skip_invalid_records {
        bump_counters(pool, job_id, total, 0, invalid, 0).await?;
        let message = format!("{} record(s) failed validation", invalid);
        fail_job(pool, job_id, &message, &timer).await?;
        return load_job(pool, job_id).await;
    }
    if invalid > 0 {
        // Invalid rows are accounted for up front; the remaining counters
        // advance batch by batch.
        bump_counters(pool, job_id, invalid, 0, invalid, 0).await?;
    }

    // Transformation phase
    if !advance(pool, job_id, JobStatus::Transforming).await? {
        return finish_interrupted(pool, job_id, &timer).await;
    }
    let phase_timer = Instant::now();
    let mut records: Vec<(i32, PostalRecord)> = Vec::with_capacity(candidates.len());
    for (row_number, candidate) in &candidates {
        match validator::into_postal_record(candidate) {
            Some(record) => records.push((*row_number, record)),
            None => {
                // validate() accepted it, so conversion cannot fail; guard
                // anyway rather than panic on a future rule mismatch.
                warn!(%job_id, row_number, "validated record failed canonical conversion");
                record_invalid(
                    pool,
                    job_id,
                    *row_number,
                    Value::Null,
                    &["record could not be converted to canonical form".to_string()],
                )
                .await?;
                bump_counters(pool, job_id, 1, 0, 1, 0).await?;
            },
        }
    }
    stats::record(
        pool,
        job_id,
        ProcessingPhase::Transformation,
        "canonicalize",
        records.len() as i32,
        phase_timer.elapsed().as_millis() as i64,
    )
    .await;

    // Insertion phase
    if !advance(pool, job_id, JobStatus::Inserting).await? {
        return finish_interrupted(pool, job_id, &timer).await;
    }
    let batch_size = config.batch_size.max(1) as usize;
    for chunk in records.chunks(batch_size) {
        if current_status(pool, job_id).await?.is_terminal() {
            return finish_interrupted(pool, job_id, &timer).await;
        }

        let batch_timer = Instant::now();
        let mut batch: Vec<ResolvedRecord> = Vec::with_capacity(chunk.len());
        for (row_number, record) in chunk {
            let action =
                match resolver::resolve(pool, record.code, config.duplicate_strategy).await {
                    Ok(action) => action,
                    Err(e) => {
                        fail_job(pool, job_id, &format!("database error: {}", e), &timer).await?;
                        return load_job(pool, job_id).await;
                    },
                };
            batch.push(ResolvedRecord {
                row_number: *row_number,
                record: record.clone(),
                action,
            });
        }

        let outcome = match inserter::write_batch(pool, &batch, config.duplicate_strategy).await {
            Ok(outcome) => outcome,
            Err(e) => {
                fail_job(pool, job_id, &format!("database error: {}", e), &timer).await?;
                return load_job(pool, job_id).await;
            },
        };
        for failure in &outcome.failures {
            let record_data = serde_json::to_value(&failure.record).unwrap_or(Value::Null);
            record_invalid(
                pool,
                job_id,
                failure.row_number,
                record_data,
                &[failure.reason.clone()],
            )
            .await?;
        }
        stats::record(
            pool,
            job_id,
            ProcessingPhase::Insertion,
            "batch-insert",
            chunk.len() as i32,
            batch_timer.elapsed().as_millis() as i64,
        )
        .await;
        bump_counters(
            pool,
            job_id,
            chunk.len() as i32,
            outcome.successful(),
            outcome.failed,
            outcome.skipped_duplicates,
        )
        .await?;
    }

    // Finalize
    stats::record(
        pool,
        job_id,
        ProcessingPhase::Completion,
        "finalize",
        records.len() as i32,
        timer.elapsed().as_millis() as i64,
    )
    .await;
    let completed = sqlx::query(
        r#"
        UPDATE import_jobs
        SET status = 'completed', completed_at = NOW(), processing_time_ms = $2,
            updated_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')
        "#,
    )
    .bind(job_id)
    .bind(timer.elapsed().as_millis() as i64)
    .execute(pool)
    .await?
    .rows_affected()
        > 0;
    if !completed {
        return finish_interrupted(pool, job_id, &timer).await;
    }

    let job = load_job(pool, job_id).await?;
    info!(
        %job_id,
        successful = job.successful_records,
        failed = job.failed_records,
        duplicates = job.duplicate_records,
        elapsed_ms = timer.elapsed().as_millis() as i64,
        "import completed"
    );
    Ok(job)
}

async fn load_job(pool: &PgPool, job_id: Uuid) -> Result<ImportJob, RunJobError> {
    sqlx::query_as::<_, ImportJob>("SELECT * FROM import_jobs WHERE id = $1")
        .bind(job_id)
        .fetch_optional(pool)
        .await?
        .ok_or(RunJobError::JobNotFound(job_id))
}

async fn load_configuration(
    pool: &PgPool,
    job_id: Uuid,
) -> Result<ImportConfiguration, RunJobError> {
    let config = sqlx::query_as::<_, ImportConfiguration>(
        r#"
        SELECT duplicate_strategy, batch_size, validate_coordinates,
               skip_invalid_records, notification_email, custom_rules
        FROM import_configurations
        WHERE job_id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(config.unwrap_or_else(|| {
        warn!(%job_id, "job has no stored configuration; using defaults");
        ImportConfiguration::default()
    }))
}

/// Claim a pending job for processing. Returns false if it is not pending.
async fn mark_started(pool: &PgPool, job_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE import_jobs
        SET status = 'processing', started_at = NOW(), updated_at = NOW()
        WHERE id = $1 AND status = 'pending'
        "#,
    )
    .bind(job_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// Advance to the next phase unless the job has been terminally resolved
/// (cancelled or failed) out from under the driver.
async fn advance(pool: &PgPool, job_id: Uuid, next: JobStatus) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE import_jobs
        SET status = $2, updated_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')
        "#,
    )
    .bind(job_id)
    .bind(next)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

async fn fail_job(
    pool: &PgPool,
    job_id: Uuid,
    message: &str,
    timer: &Instant,
) -> Result<(), sqlx::Error> {
    warn!(%job_id, message, "import failed");
    sqlx::query(
        r#"
        UPDATE import_jobs
        SET status = 'failed', error_message = $2, completed_at = NOW(),
            processing_time_ms = $3, updated_at = NOW()
        WHERE id = $1 AND status NOT IN ('completed', 'failed', 'cancelled')
        "#,
    )
    .bind(job_id)
    .bind(message)
    .bind(timer.elapsed().as_millis() as i64)
    .execute(pool)
    .await?;
    Ok(())
}

/// Wrap up after a concurrent cancel (or other terminal resolution) was
/// observed; records elapsed time and returns the job as the canceller
/// left it.
async fn finish_interrupted(
    pool: &PgPool,
    job_id: Uuid,
    timer: &Instant,
) -> Result<ImportJob, RunJobError> {
    sqlx::query(
        "UPDATE import_jobs SET processing_time_ms = $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(job_id)
    .bind(timer.elapsed().as_millis() as i64)
    .execute(pool)
    .await?;
    let job = load_job(pool, job_id).await?;
    info!(%job_id, status = %job.status, processed = job.processed_records, "import stopped early");
    Ok(job)
}

async fn current_status(pool: &PgPool, job_id: Uuid) -> Result<JobStatus, sqlx::Error> {
    sqlx::query_scalar::<_, JobStatus>("SELECT status FROM import_jobs WHERE id = $1")
        .bind(job_id)
        .fetch_one(pool)
        .await
}

async fn bump_counters(
    pool: &PgPool,
    job_id: Uuid,
    processed: i32,
    successful: i32,
    failed: i32,
    duplicates: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE import_jobs
        SET processed_records = processed_records + $2,
            successful_records = successful_records + $3,
            failed_records = failed_records + $4,
            duplicate_records = duplicate_records + $5,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .bind(processed)
    .bind(successful)
    .bind(failed)
    .bind(duplicates)
    .execute(pool)
    .await?;
    Ok(())
}

async fn record_invalid(
    pool: &PgPool,
    job_id: Uuid,
    row_number: i32,
    record_data: Value,
    errors: &[String],
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO import_validation_results
            (job_id, row_number, record_data, validation_errors, severity)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(job_id)
    .bind(row_number)
    .bind(record_data)
    .bind(sqlx::types::Json(errors))
    .bind(Severity::Error)
    .execute(pool)
    .await?;
    Ok(())
}
