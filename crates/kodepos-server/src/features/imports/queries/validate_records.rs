use mediator::Request;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::postal_codes::PostalRecord;
use crate::features::imports::pipeline::normalizer;
use crate::features::imports::pipeline::parser::{self, ParseError, RowPayload};
use crate::features::imports::pipeline::validator;
use crate::features::imports::types::ContentType;

/// Dry-run validation of a payload without creating a job or touching
/// postal data. Running the same payload twice gives the same answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRecordsQuery {
    pub content: String,
    pub content_type: ContentType,
    #[serde(default = "default_validate_coordinates")]
    pub validate_coordinates: bool,
}

fn default_validate_coordinates() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordValidationOutcome {
    pub row_number: i32,
    pub valid: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    /// Canonical form of the record, present only when it validated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<PostalRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateRecordsResponse {
    pub total_records: i32,
    pub valid_records: i32,
    pub invalid_records: i32,
    pub results: Vec<RecordValidationOutcome>,
}

#[derive(Debug, thiserror::Error)]
pub enum ValidateRecordsError {
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl Request<Result<ValidateRecordsResponse, ValidateRecordsError>> for ValidateRecordsQuery {}

#[tracing::instrument(skip(_pool, query), fields(content_type = %query.content_type))]
pub async fn handle(
    _pool: PgPool,
    query: ValidateRecordsQuery,
) -> Result<ValidateRecordsResponse, ValidateRecordsError> {
    let rows = parser::parse_payload(&query.content, query.content_type)?;

    let mut results = Vec::with_capacity(rows.len());
    let mut valid_records = 0i32;
    for row in &rows {
        let outcome = match &row.payload {
            RowPayload::Malformed { reason, .. } => RecordValidationOutcome {
                row_number: row.row_number,
                valid: false,
                errors: vec![reason.clone()],
                record: None,
            },
            RowPayload::Record(map) => {
                let candidate = normalizer::normalize(map);
                let errors = validator::validate(&candidate, query.validate_coordinates);
                let record =
                    if errors.is_empty() { validator::into_postal_record(&candidate) } else { None };
                RecordValidationOutcome {
                    row_number: row.row_number,
                    valid: errors.is_empty() && record.is_some(),
                    errors,
                    record,
                }
            },
        };
        if outcome.valid {
            valid_records += 1;
        }
        results.push(outcome);
    }

    let total_records = results.len() as i32;
    Ok(ValidateRecordsResponse {
        total_records,
        valid_records,
        invalid_records: total_records - valid_records,
        results,
    })
}
