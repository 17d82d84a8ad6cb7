pub mod get_status;
pub mod list_history;
pub mod system_stats;
pub mod validate_records;

pub use get_status::{GetJobStatusError, GetJobStatusQuery, JobStatusResponse};
pub use list_history::{ListImportJobsError, ListImportJobsQuery};
pub use system_stats::{GetSystemStatsError, GetSystemStatsQuery, SystemStatsResponse};
pub use validate_records::{
    RecordValidationOutcome, ValidateRecordsError, ValidateRecordsQuery, ValidateRecordsResponse,
};
