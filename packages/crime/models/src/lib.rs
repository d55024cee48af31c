#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident domain types shared across the crime-risk pipeline.
//!
//! Incidents are recorded at month granularity: every incident from a given
//! source month carries the same [`MonthStamp`], anchored to the first day of
//! that month. All windowing in the pipeline is calendar-month arithmetic on
//! these stamps.

use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// A calendar month, stored as the first day of the month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthStamp(NaiveDate);

impl MonthStamp {
    /// Creates a stamp for the given year and month (1-12).
    #[must_use]
    pub fn from_ym(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(Self)
    }

    /// Anchors any date to the first day of its month.
    #[must_use]
    pub fn from_date(date: NaiveDate) -> Self {
        // Day 1 exists in every month, so `with_day(1)` cannot fail.
        Self(date.with_day(1).unwrap_or(date))
    }

    /// Parses a month from `YYYY-MM`, `YYYY-MM-DD`, or
    /// `YYYY-MM-DD HH:MM:SS`. Surrounding whitespace is ignored.
    ///
    /// Returns `None` for anything else, including empty strings.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        if let Ok(date) = NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d") {
            return Some(Self(date));
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return Some(Self::from_date(date));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Some(Self::from_date(dt.date()));
        }
        None
    }

    /// Subtracts whole calendar months (`2021-03 - 12 = 2020-03`).
    ///
    /// Returns `None` if the result falls outside the representable range.
    #[must_use]
    pub fn minus_months(self, months: u32) -> Option<Self> {
        self.0.checked_sub_months(Months::new(months)).map(Self)
    }

    /// Adds whole calendar months.
    #[must_use]
    pub fn plus_months(self, months: u32) -> Option<Self> {
        self.0.checked_add_months(Months::new(months)).map(Self)
    }

    /// Calendar year of this month.
    #[must_use]
    pub fn year(self) -> i32 {
        self.0.year()
    }

    /// Month of the year, 1-12.
    #[must_use]
    pub fn month(self) -> u32 {
        self.0.month()
    }

    /// The first day of the month.
    #[must_use]
    pub const fn first_day(self) -> NaiveDate {
        self.0
    }
}

impl std::fmt::Display for MonthStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m"))
    }
}

/// Error returned when a string cannot be parsed as a [`MonthStamp`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidMonthError {
    /// The rejected input.
    pub value: String,
}

impl std::fmt::Display for InvalidMonthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid month {:?}: expected YYYY-MM", self.value)
    }
}

impl std::error::Error for InvalidMonthError {}

impl FromStr for MonthStamp {
    type Err = InvalidMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| InvalidMonthError {
            value: s.to_string(),
        })
    }
}

impl TryFrom<String> for MonthStamp {
    type Error = InvalidMonthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthStamp> for String {
    fn from(value: MonthStamp) -> Self {
        value.to_string()
    }
}

/// A single geolocated incident as seen by the neighbor-count engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    /// Month the incident was recorded in.
    pub month: MonthStamp,
    /// WGS84 latitude in decimal degrees.
    pub latitude: f64,
    /// WGS84 longitude in decimal degrees.
    pub longitude: f64,
}

impl Incident {
    #[must_use]
    pub const fn new(month: MonthStamp, latitude: f64, longitude: f64) -> Self {
        Self {
            month,
            latitude,
            longitude,
        }
    }

    /// Whether the coordinates are finite and inside the WGS84 range.
    #[must_use]
    pub fn has_valid_coordinates(&self) -> bool {
        valid_lat_lng(self.latitude, self.longitude)
    }
}

/// Returns `true` if `lat`/`lng` are finite and within `[-90, 90]` /
/// `[-180, 180]`.
#[must_use]
pub fn valid_lat_lng(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}

/// Parses a coordinate pair from raw CSV fields. Returns `None` if either
/// field is missing, unparseable, or out of range.
#[must_use]
pub fn parse_lat_lng(lat: Option<&str>, lng: Option<&str>) -> Option<(f64, f64)> {
    let latitude = lat?.trim().parse::<f64>().ok()?;
    let longitude = lng?.trim().parse::<f64>().ok()?;
    valid_lat_lng(latitude, longitude).then_some((latitude, longitude))
}

/// Crime type as recorded in the `Crime type` column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CrimeType {
    /// Residential or commercial burglary.
    #[default]
    Burglary,
    /// Any other recorded type, trimmed.
    Other(String),
}

impl CrimeType {
    /// Parses a raw crime type, matching case-insensitively after trimming.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("burglary") {
            Self::Burglary
        } else {
            Self::Other(trimmed.to_string())
        }
    }

    /// Whether `raw` names the same type as `self`, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn matches(&self, raw: &str) -> bool {
        match (self, Self::parse(raw)) {
            (Self::Burglary, Self::Burglary) => true,
            (Self::Other(expected), Self::Other(actual)) => expected.eq_ignore_ascii_case(&actual),
            _ => false,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Burglary => "Burglary",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for CrimeType {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<CrimeType> for String {
    fn from(value: CrimeType) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for CrimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_year_month() {
        let m = MonthStamp::parse("2020-01").unwrap();
        assert_eq!(m, MonthStamp::from_ym(2020, 1).unwrap());
        assert_eq!(m.to_string(), "2020-01");
    }

    #[test]
    fn normalizes_full_dates_to_first_of_month() {
        let a = MonthStamp::parse("2020-06-01").unwrap();
        let b = MonthStamp::parse("2020-06-17 13:45:00").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.first_day().day(), 1);
    }

    #[test]
    fn rejects_garbage_months() {
        assert!(MonthStamp::parse("").is_none());
        assert!(MonthStamp::parse("not-a-date").is_none());
        assert!(MonthStamp::parse("2020-13").is_none());
        assert!("2020/01".parse::<MonthStamp>().is_err());
    }

    #[test]
    fn subtracts_calendar_months() {
        let m = MonthStamp::from_ym(2021, 3).unwrap();
        assert_eq!(m.minus_months(12), MonthStamp::from_ym(2020, 3));
        assert_eq!(m.minus_months(3), MonthStamp::from_ym(2020, 12));
        assert_eq!(m.plus_months(10), MonthStamp::from_ym(2022, 1));
    }

    #[test]
    fn month_serde_roundtrip_uses_year_month_strings() {
        let m = MonthStamp::from_ym(2023, 9).unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"2023-09\"");
        let back: MonthStamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }

    #[test]
    fn parses_lat_lng_strings() {
        let (lat, lng) = parse_lat_lng(Some(" 51.5 "), Some("-0.1")).unwrap();
        assert!((lat - 51.5).abs() < f64::EPSILON);
        assert!((lng - -0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_missing_or_out_of_range_lat_lng() {
        assert!(parse_lat_lng(None, Some("-0.1")).is_none());
        assert!(parse_lat_lng(Some(""), Some("-0.1")).is_none());
        assert!(parse_lat_lng(Some("91.0"), Some("0.0")).is_none());
        assert!(parse_lat_lng(Some("NaN"), Some("0.0")).is_none());
    }

    #[test]
    fn crime_type_matches_case_insensitively() {
        assert_eq!(CrimeType::parse("  BURGLARY "), CrimeType::Burglary);
        assert!(CrimeType::Burglary.matches("burglary"));
        assert!(!CrimeType::Burglary.matches("Robbery"));
        assert!(CrimeType::Other("Robbery".into()).matches(" robbery"));
    }

    #[test]
    fn crime_type_deserializes_from_plain_strings() {
        let t: CrimeType = serde_json::from_str("\"burglary\"").unwrap();
        assert_eq!(t, CrimeType::Burglary);
        let t: CrimeType = serde_json::from_str("\"Vehicle crime\"").unwrap();
        assert_eq!(t, CrimeType::Other("Vehicle crime".to_string()));
    }
}
