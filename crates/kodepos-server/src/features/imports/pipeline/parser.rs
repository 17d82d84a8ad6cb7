//! Payload parsing
//!
//! Turns raw file content into loosely-typed rows. A row that cannot be
//! parsed as a key/value structure is carried through as malformed so the
//! driver can record it against its original row number; only a payload that
//! is unusable as a whole is a hard error.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::features::imports::types::ContentType;

/// One input row, 1-based position preserved from the original file.
#[derive(Debug, Clone)]
pub struct RawRow {
    pub row_number: i32,
    pub payload: RowPayload,
}

/// Parsed row content
#[derive(Debug, Clone)]
pub enum RowPayload {
    /// Key/value record ready for normalization.
    Record(Map<String, Value>),
    /// Row could not be parsed as a key/value structure. The original row
    /// content is preserved for the audit trail.
    Malformed { raw: Value, reason: String },
}

/// Errors that make the whole payload unusable
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Content type '{0}' cannot be parsed; convert to JSON or CSV first")]
    Unparseable(ContentType),
}

/// Parse submitted file content into rows.
///
/// JSON payloads must be an array of objects, or an object with a `data`
/// array (a shape some legacy exports use). CSV payloads must have a header
/// row naming the fields.
pub fn parse_payload(content: &str, content_type: ContentType) -> Result<Vec<RawRow>, ParseError> {
    match content_type {
        ContentType::Json => parse_json(content),
        ContentType::Csv => parse_csv(content),
        ContentType::Xlsx => Err(ParseError::Unparseable(ContentType::Xlsx)),
    }
}

fn parse_json(content: &str) -> Result<Vec<RawRow>, ParseError> {
    let value: Value = serde_json::from_str(content)
        .map_err(|e| ParseError::MalformedPayload(format!("invalid JSON: {}", e)))?;

    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(ParseError::MalformedPayload(
                    "expected a JSON array of records, or an object with a 'data' array".to_string(),
                ))
            },
        },
        _ => {
            return Err(ParseError::MalformedPayload(
                "expected a JSON array of records".to_string(),
            ))
        },
    };

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| {
            let payload = match row {
                Value::Object(map) => RowPayload::Record(map),
                other => {
                    let reason = format!(
                        "row is not a key/value record (found {})",
                        json_type_name(&other)
                    );
                    RowPayload::Malformed { raw: other, reason }
                },
            };
            RawRow {
                row_number: (i + 1) as i32,
                payload,
            }
        })
        .collect())
}

fn parse_csv(content: &str) -> Result<Vec<RawRow>, ParseError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(content.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ParseError::MalformedPayload(format!("invalid CSV header: {}", e)))?
        .clone();

    if headers.is_empty() {
        return Err(ParseError::MalformedPayload("CSV payload has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for (i, result) in reader.records().enumerate() {
        let row_number = (i + 1) as i32;
        let payload = match result {
            Ok(record) => {
                let mut map = Map::new();
                for (header, field) in headers.iter().zip(record.iter()) {
                    map.insert(header.to_string(), Value::String(field.to_string()));
                }
                RowPayload::Record(map)
            },
            Err(e) => {
                let raw = e
                    .position()
                    .and_then(|p| content.lines().nth(p.line() as usize - 1))
                    .map(|line| Value::String(line.to_string()))
                    .unwrap_or(Value::Null);
                RowPayload::Malformed { raw, reason: format!("invalid CSV row: {}", e) }
            },
        };
        rows.push(RawRow { row_number, payload });
    }

    Ok(rows)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
