//! Service-region reference data
//!
//! The service covers Indonesian postal codes. Postal codes are five-digit
//! integers; coordinates must fall inside the archipelago's bounding box;
//! every record belongs to one of the three national timezones.

use serde::{Deserialize, Serialize};

/// Smallest valid postal code for the service region.
pub const POSTAL_CODE_MIN: i32 = 10000;

/// Largest valid postal code for the service region.
pub const POSTAL_CODE_MAX: i32 = 99999;

/// Southernmost latitude of the service region.
pub const LATITUDE_MIN: f64 = -11.0;

/// Northernmost latitude of the service region.
pub const LATITUDE_MAX: f64 = 6.0;

/// Westernmost longitude of the service region.
pub const LONGITUDE_MIN: f64 = 95.0;

/// Easternmost longitude of the service region.
pub const LONGITUDE_MAX: f64 = 141.0;

/// Check whether a postal code falls in the valid range.
#[inline]
pub fn postal_code_in_range(code: i32) -> bool {
    (POSTAL_CODE_MIN..=POSTAL_CODE_MAX).contains(&code)
}

/// Check whether a coordinate pair falls inside the service region.
#[inline]
pub fn coordinates_in_bounds(latitude: f64, longitude: f64) -> bool {
    (LATITUDE_MIN..=LATITUDE_MAX).contains(&latitude)
        && (LONGITUDE_MIN..=LONGITUDE_MAX).contains(&longitude)
}

/// Indonesian timezone zones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Timezone {
    /// Waktu Indonesia Barat (UTC+7), the primary zone
    #[default]
    #[serde(rename = "WIB")]
    Wib,
    /// Waktu Indonesia Tengah (UTC+8)
    #[serde(rename = "WITA")]
    Wita,
    /// Waktu Indonesia Timur (UTC+9)
    #[serde(rename = "WIT")]
    Wit,
}

impl Timezone {
    /// All accepted timezone labels.
    pub const ALL: &'static [&'static str] = &["WIB", "WITA", "WIT"];

    /// UTC offset in hours.
    pub fn utc_offset_hours(self) -> i32 {
        match self {
            Timezone::Wib => 7,
            Timezone::Wita => 8,
            Timezone::Wit => 9,
        }
    }
}

impl std::fmt::Display for Timezone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Timezone::Wib => write!(f, "WIB"),
            Timezone::Wita => write!(f, "WITA"),
            Timezone::Wit => write!(f, "WIT"),
        }
    }
}

impl std::str::FromStr for Timezone {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "WIB" => Ok(Timezone::Wib),
            "WITA" => Ok(Timezone::Wita),
            "WIT" => Ok(Timezone::Wit),
            _ => Err(anyhow::anyhow!("Invalid timezone: {}", s)),
        }
    }
}
