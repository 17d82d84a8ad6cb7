pub mod cancel_job;
pub mod create_job;

pub use cancel_job::{CancelImportJobCommand, CancelImportJobError, CancelImportJobResponse};
pub use create_job::{CreateImportJobCommand, CreateImportJobError};
