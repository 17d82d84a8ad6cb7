//! Shared types for the import pipeline
//!
//! The job row is the single source of truth for pipeline state: every
//! status value here is persisted as text and the state machine must be
//! re-derivable from the row alone.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use thiserror::Error;
use uuid::Uuid;

/// Upper bound on a configured batch size.
pub const MAX_BATCH_SIZE: i32 = 10_000;

/// Default batch size when the caller does not specify one.
pub const DEFAULT_BATCH_SIZE: i32 = 1_000;

/// Import job status state machine
///
/// Forward-only along the processing order; any non-terminal state may move
/// to `Failed` or `Cancelled`. `Completed`, `Failed`, and `Cancelled` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Validating,
    Transforming,
    Inserting,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    /// Whether no further transitions are permitted from this state.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// Position in the forward processing order; terminal states have none.
    fn phase_order(self) -> Option<u8> {
        match self {
            JobStatus::Pending => Some(0),
            JobStatus::Processing => Some(1),
            JobStatus::Validating => Some(2),
            JobStatus::Transforming => Some(3),
            JobStatus::Inserting => Some(4),
            _ => None,
        }
    }

    /// Whether the transition `self -> next` is allowed.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        if self.is_terminal() {
            return false;
        }

        match next {
            // Any live state may fail or be cancelled.
            JobStatus::Failed | JobStatus::Cancelled => true,
            JobStatus::Completed => self == JobStatus::Inserting,
            _ => match (self.phase_order(), next.phase_order()) {
                (Some(a), Some(b)) => b > a,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Validating => "validating",
            JobStatus::Transforming => "transforming",
            JobStatus::Inserting => "inserting",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for JobStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "validating" => Ok(JobStatus::Validating),
            "transforming" => Ok(JobStatus::Transforming),
            "inserting" => Ok(JobStatus::Inserting),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            "cancelled" => Ok(JobStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid job status: {}", s)),
        }
    }
}

/// Declared content type of a submitted dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Json,
    Csv,
    /// Legacy spreadsheet uploads; recognized for audit but no longer
    /// parseable (payloads must be pre-converted to JSON or CSV).
    Xlsx,
}

impl std::str::FromStr for ContentType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" | "application/json" => Ok(ContentType::Json),
            "csv" | "text/csv" => Ok(ContentType::Csv),
            "xlsx" | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => {
                Ok(ContentType::Xlsx)
            },
            _ => Err(anyhow::anyhow!("Unsupported content type: {}", s)),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentType::Json => write!(f, "json"),
            ContentType::Csv => write!(f, "csv"),
            ContentType::Xlsx => write!(f, "xlsx"),
        }
    }
}

/// Policy for records whose code already exists in the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DuplicateStrategy {
    /// Count as duplicate, perform no write.
    #[default]
    Skip,
    /// Overwrite all non-key fields.
    Update,
    /// Treat as a failed record with a conflict reason.
    Error,
}

impl std::fmt::Display for DuplicateStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DuplicateStrategy::Skip => write!(f, "skip"),
            DuplicateStrategy::Update => write!(f, "update"),
            DuplicateStrategy::Error => write!(f, "error"),
        }
    }
}

/// Severity of a recorded validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Error,
    Warning,
    Info,
}

/// Pipeline phase a statistics row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProcessingPhase {
    Validation,
    Transformation,
    Insertion,
    Completion,
}

impl std::fmt::Display for ProcessingPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProcessingPhase::Validation => write!(f, "validation"),
            ProcessingPhase::Transformation => write!(f, "transformation"),
            ProcessingPhase::Insertion => write!(f, "insertion"),
            ProcessingPhase::Completion => write!(f, "completion"),
        }
    }
}

/// One row per import attempt
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImportJob {
    pub id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub content_type: ContentType,
    pub status: JobStatus,
    pub total_records: i32,
    pub processed_records: i32,
    pub successful_records: i32,
    pub failed_records: i32,
    pub duplicate_records: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub processing_time_ms: Option<i64>,
    pub error_message: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ImportJob {
    /// Fraction of submitted records processed so far, 0-100.
    pub fn progress_percentage(&self) -> f64 {
        if self.total_records == 0 {
            0.0
        } else {
            (self.processed_records as f64 / self.total_records as f64) * 100.0
        }
    }

    /// Naive remaining-time estimate from throughput so far.
    ///
    /// `None` means "unknown" (nothing processed yet, or no start time).
    pub fn estimated_remaining_ms(&self, now: DateTime<Utc>) -> Option<i64> {
        if self.processed_records <= 0 {
            return None;
        }
        let started = self.started_at?;
        let elapsed_ms = (now - started).num_milliseconds().max(0);
        let remaining = (self.total_records - self.processed_records).max(0) as i64;
        Some(elapsed_ms * remaining / self.processed_records as i64)
    }
}

/// Per-job import configuration, immutable once the job leaves `pending`
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImportConfiguration {
    #[serde(default)]
    pub duplicate_strategy: DuplicateStrategy,

    #[serde(default = "default_batch_size")]
    pub batch_size: i32,

    #[serde(default = "default_true")]
    pub validate_coordinates: bool,

    #[serde(default = "default_true")]
    pub skip_invalid_records: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_email: Option<String>,

    /// Opaque caller-defined rule bag, stored for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_rules: Option<serde_json::Value>,
}

fn default_batch_size() -> i32 {
    DEFAULT_BATCH_SIZE
}

fn default_true() -> bool {
    true
}

impl Default for ImportConfiguration {
    fn default() -> Self {
        Self {
            duplicate_strategy: DuplicateStrategy::Skip,
            batch_size: DEFAULT_BATCH_SIZE,
            validate_coordinates: true,
            skip_invalid_records: true,
            notification_email: None,
            custom_rules: None,
        }
    }
}

/// Errors from configuration validation
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("batch_size must be between 1 and {MAX_BATCH_SIZE}, got {0}")]
    BatchSizeOutOfRange(i32),

    #[error("notification_email is invalid: {0}")]
    InvalidEmail(String),
}

impl ImportConfiguration {
    /// Validate configuration bounds before a job is created.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.batch_size < 1 || self.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigurationError::BatchSizeOutOfRange(self.batch_size));
        }

        if let Some(ref email) = self.notification_email {
            crate::features::shared::validation::validate_email(email)
                .map_err(|_| ConfigurationError::InvalidEmail(email.clone()))?;
        }

        Ok(())
    }
}

/// One row per record that failed validation (or per record in a dry-run)
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImportValidationResult {
    pub id: Uuid,
    pub job_id: Uuid,
    pub row_number: i32,
    pub record_data: serde_json::Value,
    pub validation_errors: Json<Vec<String>>,
    pub severity: Severity,
    pub created_at: DateTime<Utc>,
}

/// One row per executed batch or phase
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ImportStatistics {
    pub id: Uuid,
    pub job_id: Uuid,
    pub processing_phase: ProcessingPhase,
    pub operation_type: String,
    pub records_count: i32,
    pub execution_time_ms: i64,
    pub memory_usage_kb: Option<i64>,
    pub cache_hits: Option<i32>,
    pub cache_misses: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Inserting.is_terminal());
    }

    #[test]
    fn test_forward_transitions_allowed() {
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Validating));
        assert!(JobStatus::Validating.can_transition_to(JobStatus::Transforming));
        assert!(JobStatus::Transforming.can_transition_to(JobStatus::Inserting));
        assert!(JobStatus::Inserting.can_transition_to(JobStatus::Completed));
        // Skipping ahead is forward movement, still allowed
        assert!(JobStatus::Pending.can_transition_to(JobStatus::Inserting));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!JobStatus::Validating.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Inserting.can_transition_to(JobStatus::Pending));
        assert!(!JobStatus::Processing.can_transition_to(JobStatus::Processing));
    }

    #[test]
    fn test_terminal_states_absorb() {
        for terminal in [JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            for next in [
                JobStatus::Pending,
                JobStatus::Processing,
                JobStatus::Failed,
                JobStatus::Cancelled,
                JobStatus::Completed,
            ] {
                assert!(
                    !terminal.can_transition_to(next),
                    "{} -> {} should be rejected",
                    terminal,
                    next
                );
            }
        }
    }

    #[test]
    fn test_any_live_state_may_fail_or_cancel() {
        for live in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Validating,
            JobStatus::Transforming,
            JobStatus::Inserting,
        ] {
            assert!(live.can_transition_to(JobStatus::Failed));
            assert!(live.can_transition_to(JobStatus::Cancelled));
        }
    }

    #[test]
    fn test_completed_only_from_inserting() {
        assert!(!JobStatus::Pending.can_transition_to(JobStatus::Completed));
        assert!(!JobStatus::Validating.can_transition_to(JobStatus::Completed));
        assert!(JobStatus::Inserting.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Validating,
            JobStatus::Transforming,
            JobStatus::Inserting,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            let parsed: JobStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("unknown".parse::<JobStatus>().is_err());
    }

    #[test]
    fn test_content_type_parsing() {
        assert_eq!("json".parse::<ContentType>().unwrap(), ContentType::Json);
        assert_eq!("application/json".parse::<ContentType>().unwrap(), ContentType::Json);
        assert_eq!("text/csv".parse::<ContentType>().unwrap(), ContentType::Csv);
        assert_eq!("XLSX".parse::<ContentType>().unwrap(), ContentType::Xlsx);
        assert!("application/pdf".parse::<ContentType>().is_err());
    }

    #[test]
    fn test_configuration_defaults() {
        let config: ImportConfiguration = serde_json::from_str("{}").unwrap();
        assert_eq!(config.duplicate_strategy, DuplicateStrategy::Skip);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert!(config.validate_coordinates);
        assert!(config.skip_invalid_records);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_configuration_batch_size_bounds() {
        let mut config = ImportConfiguration::default();

        config.batch_size = 0;
        assert_eq!(
            config.validate(),
            Err(ConfigurationError::BatchSizeOutOfRange(0))
        );

        config.batch_size = MAX_BATCH_SIZE + 1;
        assert!(config.validate().is_err());

        config.batch_size = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_configuration_email_check() {
        let config = ImportConfiguration {
            notification_email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidEmail(_))
        ));
    }

    fn job_with_progress(total: i32, processed: i32) -> ImportJob {
        ImportJob {
            id: Uuid::new_v4(),
            filename: "data.json".to_string(),
            file_size: 100,
            content_type: ContentType::Json,
            status: JobStatus::Inserting,
            total_records: total,
            processed_records: processed,
            successful_records: processed,
            failed_records: 0,
            duplicate_records: 0,
            started_at: Some(Utc::now() - chrono::Duration::seconds(10)),
            completed_at: None,
            processing_time_ms: None,
            error_message: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_progress_percentage() {
        assert_eq!(job_with_progress(0, 0).progress_percentage(), 0.0);
        assert_eq!(job_with_progress(4, 1).progress_percentage(), 25.0);
        assert_eq!(job_with_progress(4, 4).progress_percentage(), 100.0);
    }

    #[test]
    fn test_estimated_remaining_unknown_without_progress() {
        let job = job_with_progress(10, 0);
        assert_eq!(job.estimated_remaining_ms(Utc::now()), None);
    }

    #[test]
    fn test_estimated_remaining_scales_with_backlog() {
        let job = job_with_progress(10, 5);
        let now = Utc::now();
        let estimate = job.estimated_remaining_ms(now).unwrap();
        // 5 of 10 done in ~10s, so about 10s remain
        assert!(estimate > 8_000 && estimate < 12_000, "estimate {}", estimate);
    }
}
