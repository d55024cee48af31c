#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Ingestion configuration and per-stage result types.

use std::path::PathBuf;
use std::time::Duration;

use crime_risk_crime_models::CrimeType;
use crime_risk_spatial::NeighborCountConfig;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Default name of the column the neighbor counts are written to.
pub const DEFAULT_OUTPUT_COLUMN: &str = "num_crimes_past_year_1km";

/// What to do with rows that cannot take part in neighbor counting
/// (unparseable month or unusable coordinates).
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum InvalidRowPolicy {
    /// Keep the row in the output with a count of 0.
    #[default]
    Zero,
    /// Leave the row out of the output.
    Drop,
}

/// Names of the input columns the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    /// Month column (`YYYY-MM` or a date).
    pub month: String,
    /// Latitude column.
    pub latitude: String,
    /// Longitude column.
    pub longitude: String,
    /// Crime type column, used by the clean stage.
    pub crime_type: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            month: "Month".to_string(),
            latitude: "Latitude".to_string(),
            longitude: "Longitude".to_string(),
            crime_type: "Crime type".to_string(),
        }
    }
}

/// Full pipeline configuration, loadable from TOML.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Input column names.
    pub columns: ColumnNames,
    /// Crime type kept by the clean stage.
    pub crime_type: CrimeType,
    /// Whether the clean stage fails when the crime type column is
    /// missing. When `false` a missing column keeps every row.
    pub require_crime_type: bool,
    /// Engine parameters.
    pub neighbors: NeighborCountConfig,
    /// Column the neighbor counts are written to.
    pub output_column: String,
    /// Handling of rows excluded from counting.
    pub invalid_rows: InvalidRowPolicy,
    /// Incidents per parallel chunk; `None` runs the sequential engine.
    pub chunk_len: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            columns: ColumnNames::default(),
            crime_type: CrimeType::Burglary,
            require_crime_type: false,
            neighbors: NeighborCountConfig::default(),
            output_column: DEFAULT_OUTPUT_COLUMN.to_string(),
            invalid_rows: InvalidRowPolicy::default(),
            chunk_len: None,
        }
    }
}

/// Row counts from the clean stage, one per filtering phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanReport {
    /// Rows read.
    pub loaded: u64,
    /// Rows whose crime type matched.
    pub type_matched: u64,
    /// Rows that also had usable coordinates.
    pub geo_valid: u64,
    /// Rows that also had a parseable month; these were written.
    pub month_valid: u64,
}

/// Row counts from the filter-since stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterReport {
    /// Rows read.
    pub loaded: u64,
    /// Rows dropped because the month could not be parsed.
    pub invalid_month: u64,
    /// Rows at or after the cutoff month; these were written.
    pub kept: u64,
}

/// One per-year file written by the split stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearFile {
    /// Calendar year.
    pub year: i32,
    /// Path of the written file.
    pub path: PathBuf,
    /// Data rows (excluding the header).
    pub rows: u64,
    /// File size in bytes.
    pub bytes: u64,
}

/// Result of the split-by-year stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitReport {
    /// Rows read.
    pub loaded: u64,
    /// Rows skipped because the month could not be parsed.
    pub skipped: u64,
    /// Files written, sorted by year.
    pub files: Vec<YearFile>,
    /// How long the split took.
    pub duration: Duration,
}

/// Result of the count-neighbors stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountReport {
    /// Rows read.
    pub loaded: u64,
    /// Rows with a parseable month.
    pub month_valid: u64,
    /// Rows that also had usable coordinates; these were counted.
    pub geo_valid: u64,
    /// Counted rows with at least one neighbor.
    pub non_zero: u64,
    /// Rows written to the output.
    pub written: u64,
    /// How long the stage took.
    pub duration: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_case_insensitively() {
        assert_eq!("zero".parse::<InvalidRowPolicy>().unwrap(), InvalidRowPolicy::Zero);
        assert_eq!("DROP".parse::<InvalidRowPolicy>().unwrap(), InvalidRowPolicy::Drop);
        assert!("skip".parse::<InvalidRowPolicy>().is_err());
        assert_eq!(InvalidRowPolicy::Drop.to_string(), "drop");
    }

    #[test]
    fn empty_config_is_all_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.output_column, DEFAULT_OUTPUT_COLUMN);
        assert_eq!(config.columns.month, "Month");
    }

    #[test]
    fn partial_config_overrides_only_named_fields() {
        let config: PipelineConfig = toml::from_str(
            r#"
            invalid_rows = "drop"
            crime_type = "Robbery"

            [columns]
            month = "dt"

            [neighbors]
            radius_km = 0.5
            "#,
        )
        .unwrap();

        assert_eq!(config.invalid_rows, InvalidRowPolicy::Drop);
        assert_eq!(config.crime_type, CrimeType::Other("Robbery".to_string()));
        assert_eq!(config.columns.month, "dt");
        assert_eq!(config.columns.latitude, "Latitude");
        assert!((config.neighbors.radius_km - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.neighbors.window_months, 12);
    }
}
