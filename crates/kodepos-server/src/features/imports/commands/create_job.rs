use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::features::imports::types::{ContentType, ImportConfiguration, ImportJob};
use crate::features::shared::validation::{validate_filename, FilenameValidationError};

pub const MAX_FILENAME_LENGTH: usize = 255;

/// Register a new import job in `pending` state.
///
/// The payload itself is not part of the command; the caller hands it to
/// the pipeline runner once the job row exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateImportJobCommand {
    pub filename: String,
    pub file_size: i64,
    pub content_type: ContentType,
    #[serde(default)]
    pub configuration: ImportConfiguration,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CreateImportJobError {
    #[error("Filename is invalid: {0}")]
    Filename(#[from] FilenameValidationError),
    #[error("File size must be greater than zero")]
    FileSize,
    #[error("Invalid configuration: {0}")]
    Configuration(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CreateImportJobCommand {
    pub fn validate(&self) -> Result<(), CreateImportJobError> {
        validate_filename(&self.filename, MAX_FILENAME_LENGTH)?;
        if self.file_size <= 0 {
            return Err(CreateImportJobError::FileSize);
        }
        self.configuration
            .validate()
            .map_err(|e| CreateImportJobError::Configuration(e.to_string()))?;
        Ok(())
    }
}

impl Request<Result<ImportJob, CreateImportJobError>> for CreateImportJobCommand {}

#[tracing::instrument(skip(pool, command), fields(filename = %command.filename))]
pub async fn handle(
    pool: PgPool,
    command: CreateImportJobCommand,
) -> Result<ImportJob, CreateImportJobError> {
    command.validate()?;

    let mut tx = pool.begin().await?;

    let job = sqlx::query_as::<_, ImportJob>(
        r#"
        INSERT INTO import_jobs (filename, file_size, content_type, created_by)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&command.filename)
    .bind(command.file_size)
    .bind(command.content_type)
    .bind(&command.created_by)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO import_configurations
            (job_id, duplicate_strategy, batch_size, validate_coordinates,
             skip_invalid_records, notification_email, custom_rules)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(job.id)
    .bind(command.configuration.duplicate_strategy)
    .bind(command.configuration.batch_size)
    .bind(command.configuration.validate_coordinates)
    .bind(command.configuration.skip_invalid_records)
    .bind(&command.configuration.notification_email)
    .bind(&command.configuration.custom_rules)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(job_id = %job.id, "import job created");
    Ok(job)
}
