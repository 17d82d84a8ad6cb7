use std::str::FromStr;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::api::response::ApiResponse;
use crate::error::AppError;
use crate::features::FeatureState;

use super::commands::{
    CancelImportJobCommand, CancelImportJobError, CreateImportJobCommand, CreateImportJobError,
};
use super::pipeline::normalizer::FIELD_ALIASES;
use super::pipeline::parser::ParseError;
use super::pipeline::runner::{self, RunJobError};
use super::queries::{
    GetJobStatusError, GetJobStatusQuery, GetSystemStatsError, GetSystemStatsQuery,
    ListImportJobsError, ListImportJobsQuery, ValidateRecordsError, ValidateRecordsQuery,
};
use super::types::{ContentType, ImportConfiguration};

pub fn imports_routes() -> Router<FeatureState> {
    Router::new()
        .route("/", post(submit_import))
        .route("/", get(list_imports))
        .route("/stats", get(get_system_stats))
        .route("/templates", get(get_templates))
        .route("/validate", post(validate_records))
        .route("/:job_id", get(get_job_status))
        .route("/:job_id/cancel", post(cancel_job))
}

/// Dataset submission body. The file content travels inline; the declared
/// size is checked against both the ceiling and the actual content length.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitImportRequest {
    pub filename: String,
    pub content_type: String,
    pub content: String,
    #[serde(default)]
    pub file_size: Option<i64>,
    #[serde(default)]
    pub configuration: Option<ImportConfiguration>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[tracing::instrument(skip(state, request), fields(filename = %request.filename))]
async fn submit_import(
    State(state): State<FeatureState>,
    Json(request): Json<SubmitImportRequest>,
) -> Result<Response, AppError> {
    let content_type = parse_content_type(&request.content_type)?;
    let file_size = check_file_size(
        request.file_size,
        request.content.len(),
        state.import_limits.max_file_size_bytes,
    )?;

    let command = CreateImportJobCommand {
        filename: request.filename,
        file_size,
        content_type,
        configuration: request.configuration.unwrap_or_default(),
        created_by: request.created_by,
    };
    let job = super::commands::create_job::handle(state.db.clone(), command).await?;

    // The payload is processed within the request; the job row tracks
    // progress for anyone polling concurrently.
    let job = runner::run_job(&state.db, job.id, &request.content).await?;

    tracing::info!(job_id = %job.id, status = %job.status, "import submitted via API");
    Ok((StatusCode::CREATED, Json(ApiResponse::success(job))).into_response())
}

#[tracing::instrument(skip(state, query), fields(page = ?query.pagination.page))]
async fn list_imports(
    State(state): State<FeatureState>,
    Query(query): Query<ListImportJobsQuery>,
) -> Result<Response, AppError> {
    let page = super::queries::list_history::handle(state.db, query).await?;

    let meta = json!({ "pagination": page.pagination });
    Ok((StatusCode::OK, Json(ApiResponse::success_with_meta(page.items, meta))).into_response())
}

#[tracing::instrument(skip(state))]
async fn get_system_stats(State(state): State<FeatureState>) -> Result<Response, AppError> {
    let stats =
        super::queries::system_stats::handle(state.db, GetSystemStatsQuery::default()).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(stats))).into_response())
}

/// Static submission templates: an example payload per supported format,
/// the recognized field aliases, and the default configuration.
async fn get_templates() -> Response {
    let example = json!({
        "code": 10110,
        "village": "Gambir",
        "district": "Gambir",
        "regency": "Jakarta Pusat",
        "province": "DKI Jakarta",
        "latitude": -6.1754,
        "longitude": 106.8272,
        "elevation": 5,
        "timezone": "WIB"
    });

    let aliases: serde_json::Map<String, serde_json::Value> = FIELD_ALIASES
        .iter()
        .map(|(canonical, aliases)| ((*canonical).to_string(), json!(aliases)))
        .collect();

    let templates = json!({
        "json_template": [example],
        "csv_template": "code,village,district,regency,province,latitude,longitude,elevation,timezone\n\
                         10110,Gambir,Gambir,Jakarta Pusat,DKI Jakarta,-6.1754,106.8272,5,WIB",
        "field_aliases": aliases,
        "configuration_defaults": ImportConfiguration::default(),
    });

    (StatusCode::OK, Json(ApiResponse::success(templates))).into_response()
}

#[tracing::instrument(skip(state), fields(job_id = %job_id))]
async fn get_job_status(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response = super::queries::get_status::handle(state.db, GetJobStatusQuery { job_id }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

/// Dry-run validation body, mirroring the submission shape minus the
/// job-creating fields.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateImportRequest {
    pub content_type: String,
    pub content: String,
    #[serde(default)]
    pub validate_coordinates: Option<bool>,
}

#[tracing::instrument(skip(state, request))]
async fn validate_records(
    State(state): State<FeatureState>,
    Json(request): Json<ValidateImportRequest>,
) -> Result<Response, AppError> {
    let content_type = parse_content_type(&request.content_type)?;
    check_file_size(None, request.content.len(), state.import_limits.max_file_size_bytes)?;

    let query = ValidateRecordsQuery {
        content: request.content,
        content_type,
        validate_coordinates: request.validate_coordinates.unwrap_or(true),
    };
    let response = super::queries::validate_records::handle(state.db, query).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

#[tracing::instrument(skip(state), fields(job_id = %job_id))]
async fn cancel_job(
    State(state): State<FeatureState>,
    Path(job_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let response =
        super::commands::cancel_job::handle(state.db, CancelImportJobCommand { job_id }).await?;
    Ok((StatusCode::OK, Json(ApiResponse::success(response))).into_response())
}

fn parse_content_type(raw: &str) -> Result<ContentType, AppError> {
    ContentType::from_str(raw).map_err(|e| AppError::UnsupportedContentType(e.to_string()))
}

/// Enforce the submission ceiling against both the declared size and the
/// actual content length, whichever is larger.
fn check_file_size(
    declared: Option<i64>,
    content_len: usize,
    max_bytes: i64,
) -> Result<i64, AppError> {
    let effective = declared.unwrap_or(0).max(content_len as i64);
    if effective > max_bytes {
        return Err(AppError::FileTooLarge(format!(
            "File of {} bytes exceeds the {} byte limit",
            effective, max_bytes
        )));
    }
    Ok(effective)
}

impl From<CreateImportJobError> for AppError {
    fn from(err: CreateImportJobError) -> Self {
        match err {
            CreateImportJobError::Filename(_) | CreateImportJobError::FileSize => {
                AppError::Validation(err.to_string())
            },
            CreateImportJobError::Configuration(msg) => AppError::InvalidConfiguration(msg),
            CreateImportJobError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<CancelImportJobError> for AppError {
    fn from(err: CancelImportJobError) -> Self {
        match err {
            CancelImportJobError::NotFound(id) => AppError::JobNotFound(id),
            CancelImportJobError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<GetJobStatusError> for AppError {
    fn from(err: GetJobStatusError) -> Self {
        match err {
            GetJobStatusError::NotFound(id) => AppError::JobNotFound(id),
            GetJobStatusError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ListImportJobsError> for AppError {
    fn from(err: ListImportJobsError) -> Self {
        match err {
            ListImportJobsError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<GetSystemStatsError> for AppError {
    fn from(err: GetSystemStatsError) -> Self {
        match err {
            GetSystemStatsError::Database(e) => AppError::Database(e),
        }
    }
}

impl From<ValidateRecordsError> for AppError {
    fn from(err: ValidateRecordsError) -> Self {
        match err {
            ValidateRecordsError::Parse(ParseError::Unparseable(_)) => {
                AppError::UnsupportedContentType(err.to_string())
            },
            ValidateRecordsError::Parse(ParseError::MalformedPayload(_)) => {
                AppError::MalformedPayload(err.to_string())
            },
        }
    }
}

impl From<RunJobError> for AppError {
    fn from(err: RunJobError) -> Self {
        match err {
            RunJobError::JobNotFound(id) => AppError::JobNotFound(id),
            RunJobError::NotStartable(..) => AppError::BadRequest(err.to_string()),
            RunJobError::Database(e) => AppError::Database(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_file_size_within_limit() {
        assert_eq!(check_file_size(Some(100), 80, 1000).unwrap(), 100);
        assert_eq!(check_file_size(None, 80, 1000).unwrap(), 80);
    }

    #[test]
    fn test_check_file_size_uses_larger_of_declared_and_actual() {
        // Understated declarations do not dodge the ceiling.
        assert!(check_file_size(Some(10), 2000, 1000).is_err());
        assert!(check_file_size(Some(2000), 10, 1000).is_err());
    }

    #[test]
    fn test_parse_content_type_accepts_mime_names() {
        assert_eq!(parse_content_type("application/json").unwrap(), ContentType::Json);
        assert_eq!(parse_content_type("text/csv").unwrap(), ContentType::Csv);
        assert!(matches!(
            parse_content_type("application/pdf"),
            Err(AppError::UnsupportedContentType(_))
        ));
    }

    #[test]
    fn test_input_error_mappings() {
        let err: AppError = CreateImportJobError::Configuration("batch_size".to_string()).into();
        assert_eq!(err.code(), "INVALID_CONFIGURATION");

        let err: AppError =
            ValidateRecordsError::Parse(ParseError::MalformedPayload("bad".to_string())).into();
        assert_eq!(err.code(), "MALFORMED_PAYLOAD");

        let err: AppError =
            ValidateRecordsError::Parse(ParseError::Unparseable(ContentType::Xlsx)).into();
        assert_eq!(err.code(), "UNSUPPORTED_CONTENT_TYPE");

        let err: AppError = CancelImportJobError::NotFound(Uuid::nil()).into();
        assert_eq!(err.code(), "JOB_NOT_FOUND");
    }
}
