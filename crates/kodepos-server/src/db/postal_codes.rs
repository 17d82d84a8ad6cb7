//! Canonical postal record store access
//!
//! The `postal_codes` table is shared with the read-path services; the import
//! pipeline reads it for duplicate detection and conditionally writes it.
//! Uniqueness of `code` is enforced by the primary key, which is the final
//! arbiter when concurrent imports race on the same code.

use kodepos_common::region::Timezone;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Canonical postal record, the target entity of an import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostalRecord {
    pub code: i32,
    pub village: String,
    pub district: String,
    pub regency: String,
    pub province: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elevation: Option<i32>,
    pub timezone: Timezone,
}

/// Check whether a record with the given code already exists.
pub async fn code_exists(pool: &PgPool, code: i32) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM postal_codes WHERE code = $1")
        .bind(code)
        .fetch_optional(pool)
        .await?;

    Ok(found.is_some())
}

/// Insert a new postal record.
///
/// A unique-constraint violation is surfaced as `sqlx::Error::Database`; the
/// batch inserter reclassifies it rather than failing the job.
pub async fn insert_record(pool: &PgPool, record: &PostalRecord) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO postal_codes
            (code, village, district, regency, province, latitude, longitude, elevation, timezone)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(record.code)
    .bind(&record.village)
    .bind(&record.district)
    .bind(&record.regency)
    .bind(&record.province)
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(record.elevation)
    .bind(record.timezone.to_string())
    .execute(pool)
    .await?;

    Ok(())
}

/// Overwrite all non-key fields of an existing record.
///
/// Returns whether a row was actually updated.
pub async fn update_record(pool: &PgPool, record: &PostalRecord) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE postal_codes
        SET village = $2, district = $3, regency = $4, province = $5,
            latitude = $6, longitude = $7, elevation = $8, timezone = $9,
            updated_at = now()
        WHERE code = $1
        "#,
    )
    .bind(record.code)
    .bind(&record.village)
    .bind(&record.district)
    .bind(&record.regency)
    .bind(&record.province)
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(record.elevation)
    .bind(record.timezone.to_string())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Total number of stored postal records.
pub async fn count_records(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM postal_codes")
        .fetch_one(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_record() -> PostalRecord {
        PostalRecord {
            code: 10110,
            village: "Gambir".to_string(),
            district: "Gambir".to_string(),
            regency: "Jakarta Pusat".to_string(),
            province: "DKI Jakarta".to_string(),
            latitude: -6.17,
            longitude: 106.82,
            elevation: Some(4),
            timezone: Timezone::Wib,
        }
    }

    #[test]
    fn test_record_serialization_uses_zone_labels() {
        let record = sample_record();
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["timezone"], "WIB");
        assert_eq!(value["code"], 10110);
    }

    #[test]
    fn test_record_elevation_omitted_when_absent() {
        let mut record = sample_record();
        record.elevation = None;
        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("elevation").is_none());
    }
}
