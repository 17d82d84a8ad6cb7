//! Bulk import pipeline for postal-code datasets
//!
//! Callers submit a JSON or CSV payload; the server registers a job,
//! drives it through validation, transformation, and batched insertion,
//! and exposes the job row for status polling, history, and statistics.

pub mod commands;
pub mod pipeline;
pub mod queries;
pub mod routes;
pub mod types;

pub use commands::{
    CancelImportJobCommand, CancelImportJobError, CancelImportJobResponse, CreateImportJobCommand,
    CreateImportJobError,
};

pub use queries::{
    GetJobStatusError, GetJobStatusQuery, GetSystemStatsError, GetSystemStatsQuery,
    JobStatusResponse, ListImportJobsError, ListImportJobsQuery, RecordValidationOutcome,
    SystemStatsResponse, ValidateRecordsError, ValidateRecordsQuery, ValidateRecordsResponse,
};

pub use routes::imports_routes;

pub use types::{
    ContentType, DuplicateStrategy, ImportConfiguration, ImportJob, ImportStatistics,
    ImportValidationResult, JobStatus, ProcessingPhase, Severity,
};
