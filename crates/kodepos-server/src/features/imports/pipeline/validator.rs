//! Record validation
//!
//! Checks every rule against a candidate record independently, so a single
//! record reports all of its problems in one pass rather than failing on
//! the first. A record with no failures converts into a canonical
//! [`PostalRecord`] ready for insertion.

use std::str::FromStr;

use kodepos_common::region::{
    coordinates_in_bounds, postal_code_in_range, Timezone, LATITUDE_MAX, LATITUDE_MIN,
    LONGITUDE_MAX, LONGITUDE_MIN, POSTAL_CODE_MAX, POSTAL_CODE_MIN,
};

use crate::db::postal_codes::PostalRecord;
use crate::features::imports::pipeline::normalizer::{CandidateRecord, FieldValue};

/// Validate a candidate record, returning every rule failure.
///
/// Coordinate presence is always checked since the canonical record cannot
/// be built without coordinates; the geographic bounds check alone is gated
/// by `validate_coordinates`.
pub fn validate(candidate: &CandidateRecord, validate_coordinates: bool) -> Vec<String> {
    let mut failures = Vec::new();

    match &candidate.code {
        FieldValue::Missing => failures.push("code is required".to_string()),
        FieldValue::Invalid(raw) => {
            failures.push(format!("code '{}' is not an integer", raw));
        },
        FieldValue::Value(code) => {
            let in_range =
                i32::try_from(*code).map(postal_code_in_range).unwrap_or(false);
            if !in_range {
                failures.push(format!(
                    "code {} is outside the valid range {}-{}",
                    code, POSTAL_CODE_MIN, POSTAL_CODE_MAX
                ));
            }
        },
    }

    for (name, field) in [
        ("village", &candidate.village),
        ("district", &candidate.district),
        ("regency", &candidate.regency),
        ("province", &candidate.province),
    ] {
        match field {
            FieldValue::Missing => failures.push(format!("{} is required", name)),
            FieldValue::Invalid(raw) => {
                failures.push(format!("{} '{}' is not a text value", name, raw));
            },
            FieldValue::Value(_) => {},
        }
    }

    check_coordinate(&mut failures, "latitude", &candidate.latitude);
    check_coordinate(&mut failures, "longitude", &candidate.longitude);

    if validate_coordinates {
        if let (FieldValue::Value(lat), FieldValue::Value(lng)) =
            (&candidate.latitude, &candidate.longitude)
        {
            if !coordinates_in_bounds(*lat, *lng) {
                failures.push(format!(
                    "coordinates ({}, {}) are outside the supported area (latitude {} to {}, longitude {} to {})",
                    lat, lng, LATITUDE_MIN, LATITUDE_MAX, LONGITUDE_MIN, LONGITUDE_MAX
                ));
            }
        }
    }

    match &candidate.elevation {
        FieldValue::Invalid(raw) => {
            failures.push(format!("elevation '{}' is not an integer", raw));
        },
        FieldValue::Value(elevation) if i32::try_from(*elevation).is_err() => {
            failures.push(format!("elevation {} is out of range", elevation));
        },
        _ => {},
    }

    match &candidate.timezone {
        FieldValue::Missing => {},
        FieldValue::Invalid(raw) => {
            failures.push(format!("timezone '{}' is not a text value", raw));
        },
        FieldValue::Value(tz) => {
            if Timezone::from_str(tz).is_err() {
                failures.push(format!("timezone '{}' is not one of WIB, WITA, WIT", tz));
            }
        },
    }

    failures
}

fn check_coordinate(failures: &mut Vec<String>, name: &str, field: &FieldValue<f64>) {
    match field {
        FieldValue::Missing => failures.push(format!("{} is required", name)),
        FieldValue::Invalid(raw) => {
            failures.push(format!("{} '{}' is not a number", name, raw));
        },
        FieldValue::Value(value) if !value.is_finite() => {
            failures.push(format!("{} must be a finite number", name));
        },
        FieldValue::Value(_) => {},
    }
}

/// Build the canonical record from a candidate that passed validation.
///
/// Returns `None` if any required field is unusable; callers are expected
/// to have checked [`validate`] first. Timezone defaults to WIB when the
/// source row does not carry one.
pub fn into_postal_record(candidate: &CandidateRecord) -> Option<PostalRecord> {
    let timezone = match &candidate.timezone {
        FieldValue::Missing => Timezone::Wib,
        FieldValue::Value(tz) => Timezone::from_str(tz).ok()?,
        FieldValue::Invalid(_) => return None,
    };

    let elevation = match &candidate.elevation {
        FieldValue::Missing => None,
        FieldValue::Value(e) => Some(i32::try_from(*e).ok()?),
        FieldValue::Invalid(_) => return None,
    };

    Some(PostalRecord {
        code: i32::try_from(*candidate.code.as_value()?).ok()?,
        village: candidate.village.as_value()?.clone(),
        district: candidate.district.as_value()?.clone(),
        regency: candidate.regency.as_value()?.clone(),
        province: candidate.province.as_value()?.clone(),
        latitude: *candidate.latitude.as_value()?,
        longitude: *candidate.longitude.as_value()?,
        elevation,
        timezone,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::imports::pipeline::normalizer::normalize;
    use serde_json::{json, Map, Value};

    fn candidate(value: Value) -> CandidateRecord {
        let map: Map<String, Value> = value.as_object().cloned().unwrap_or_default();
        normalize(&map)
    }

    fn complete_row() -> Value {
        json!({
            "code": 10110,
            "village": "Gambir",
            "district": "Gambir",
            "regency": "Jakarta Pusat",
            "province": "DKI Jakarta",
            "latitude": -6.17,
            "longitude": 106.82,
            "timezone": "WIB"
        })
    }

    #[test]
    fn test_valid_record_has_no_failures() {
        assert!(validate(&candidate(complete_row()), true).is_empty());
    }

    #[test]
    fn test_all_failures_reported_not_just_first() {
        let failures = validate(&candidate(json!({"code": "abc"})), true);
        assert!(failures.len() >= 6, "got {:?}", failures);
        assert!(failures.iter().any(|f| f.contains("code")));
        assert!(failures.iter().any(|f| f.contains("village")));
        assert!(failures.iter().any(|f| f.contains("latitude")));
    }

    #[test]
    fn test_code_out_of_range() {
        let mut row = complete_row();
        row["code"] = json!(9999);
        let failures = validate(&candidate(row), true);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("10000-99999"));
    }

    #[test]
    fn test_coordinate_bounds_gated_by_flag() {
        let mut row = complete_row();
        row["latitude"] = json!(48.85);
        row["longitude"] = json!(2.35);
        assert_eq!(validate(&candidate(row.clone()), true).len(), 1);
        assert!(validate(&candidate(row), false).is_empty());
    }

    #[test]
    fn test_coordinates_required_even_without_bounds_check() {
        let mut row = complete_row();
        row.as_object_mut().unwrap().remove("latitude");
        let failures = validate(&candidate(row), false);
        assert_eq!(failures, vec!["latitude is required".to_string()]);
    }

    #[test]
    fn test_unknown_timezone_rejected() {
        let mut row = complete_row();
        row["timezone"] = json!("UTC");
        let failures = validate(&candidate(row), true);
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("WIB, WITA, WIT"));
    }

    #[test]
    fn test_missing_timezone_defaults_to_wib() {
        let mut row = complete_row();
        row.as_object_mut().unwrap().remove("timezone");
        let cand = candidate(row);
        assert!(validate(&cand, true).is_empty());
        let record = into_postal_record(&cand).unwrap();
        assert_eq!(record.timezone, Timezone::Wib);
    }

    #[test]
    fn test_into_postal_record_complete() {
        let cand = candidate(complete_row());
        let record = into_postal_record(&cand).unwrap();
        assert_eq!(record.code, 10110);
        assert_eq!(record.village, "Gambir");
        assert_eq!(record.elevation, None);
    }

    #[test]
    fn test_into_postal_record_incomplete_returns_none() {
        assert!(into_postal_record(&candidate(json!({"code": 10110}))).is_none());
    }
}
