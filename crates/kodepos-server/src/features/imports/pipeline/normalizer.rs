//! Record normalization
//!
//! Maps loosely-typed input rows onto the canonical postal-code field set.
//! Source datasets name fields inconsistently (Indonesian and English,
//! long and abbreviated forms), so every field resolves through an alias
//! table. Normalization is pure and never fails a record; fields that are
//! absent or carry an unusable value are marked so validation can report
//! every problem at once.

use serde_json::{Map, Value};

/// Alias table mapping canonical field names to the spellings seen in
/// source datasets. The canonical name itself always matches.
pub const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("code", &["kodepos", "postal_code", "kode_pos", "zip"]),
    ("village", &["desa", "kelurahan", "urban"]),
    ("district", &["kecamatan", "sub_district", "subdistrict"]),
    ("regency", &["kabupaten", "kota", "city"]),
    ("province", &["provinsi", "state"]),
    ("latitude", &["lat"]),
    ("longitude", &["lng", "lon", "long"]),
    ("elevation", &["alt", "altitude"]),
    ("timezone", &["tz", "zona_waktu"]),
];

/// A field after normalization: present and typed, present but unusable,
/// or absent from the row entirely.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue<T> {
    Missing,
    /// Present but not convertible; carries a display form of the raw value.
    Invalid(String),
    Value(T),
}

impl<T> FieldValue<T> {
    pub fn as_value(&self) -> Option<&T> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// A row normalized onto the canonical field set, prior to validation.
#[derive(Debug, Clone)]
pub struct CandidateRecord {
    pub code: FieldValue<i64>,
    pub village: FieldValue<String>,
    pub district: FieldValue<String>,
    pub regency: FieldValue<String>,
    pub province: FieldValue<String>,
    pub latitude: FieldValue<f64>,
    pub longitude: FieldValue<f64>,
    pub elevation: FieldValue<i64>,
    pub timezone: FieldValue<String>,
}

/// Normalize one parsed row into a candidate record.
pub fn normalize(row: &Map<String, Value>) -> CandidateRecord {
    CandidateRecord {
        code: integer_field(row, "code"),
        village: string_field(row, "village"),
        district: string_field(row, "district"),
        regency: string_field(row, "regency"),
        province: string_field(row, "province"),
        latitude: float_field(row, "latitude"),
        longitude: float_field(row, "longitude"),
        elevation: integer_field(row, "elevation"),
        timezone: string_field(row, "timezone"),
    }
}

/// Look up a field by canonical name or any of its aliases.
///
/// The canonical name wins when both it and an alias are present; among
/// aliases, the first listed in the table wins.
fn lookup<'a>(row: &'a Map<String, Value>, canonical: &str) -> Option<&'a Value> {
    if let Some(value) = row.get(canonical) {
        return Some(value);
    }
    let aliases = FIELD_ALIASES
        .iter()
        .find(|(name, _)| *name == canonical)
        .map(|(_, aliases)| *aliases)
        .unwrap_or(&[]);
    aliases.iter().find_map(|alias| row.get(*alias))
}

fn string_field(row: &Map<String, Value>, canonical: &str) -> FieldValue<String> {
    match lookup(row, canonical) {
        None | Some(Value::Null) => FieldValue::Missing,
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                FieldValue::Missing
            } else {
                FieldValue::Value(trimmed.to_string())
            }
        },
        Some(other) => FieldValue::Invalid(other.to_string()),
    }
}

fn integer_field(row: &Map<String, Value>, canonical: &str) -> FieldValue<i64> {
    match lookup(row, canonical) {
        None | Some(Value::Null) => FieldValue::Missing,
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => FieldValue::Value(i),
            None => FieldValue::Invalid(n.to_string()),
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                FieldValue::Missing
            } else {
                match trimmed.parse::<i64>() {
                    Ok(i) => FieldValue::Value(i),
                    Err(_) => FieldValue::Invalid(trimmed.to_string()),
                }
            }
        },
        Some(other) => FieldValue::Invalid(other.to_string()),
    }
}

fn float_field(row: &Map<String, Value>, canonical: &str) -> FieldValue<f64> {
    match lookup(row, canonical) {
        None | Some(Value::Null) => FieldValue::Missing,
        Some(Value::Number(n)) => match n.as_f64() {
            Some(f) => FieldValue::Value(f),
            None => FieldValue::Invalid(n.to_string()),
        },
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                FieldValue::Missing
            } else {
                match trimmed.parse::<f64>() {
                    Ok(f) => FieldValue::Value(f),
                    Err(_) => FieldValue::Invalid(trimmed.to_string()),
                }
            }
        },
        Some(other) => FieldValue::Invalid(other.to_string()),
    }
}
