#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CSV stages that prepare burglary incident records and annotate them
//! with spatio-temporal neighbor counts.
//!
//! Each stage reads a comma-separated file with a header row and writes a
//! new one: [`clean::clean`], [`filter::filter_since`],
//! [`split::split_by_year`], and [`count::count_neighbors`]. The `*_file`
//! wrappers here open and create the files and derive default output
//! paths the same way for every stage.

pub mod clean;
pub mod count;
pub mod filter;
pub mod interactive;
pub mod split;
pub mod table;

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crime_risk_crime_models::MonthStamp;
use crime_risk_ingest_models::{
    CleanReport, CountReport, FilterReport, PipelineConfig, SplitReport,
};
use crime_risk_spatial::NeighborCountError;
use crime_risk_spatial::progress::ProgressCallback;

/// Default name prefix for per-year files.
pub const DEFAULT_SPLIT_PREFIX: &str = "burglaries";

/// Errors that can occur while running an ingest stage.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// CSV reading or writing failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file open/create/stat).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The pipeline config file could not be parsed.
    #[error("Config error in {}: {message}", path.display())]
    Config {
        /// Path of the config file.
        path: PathBuf,
        /// Parser message.
        message: String,
    },

    /// A column the stage needs is not in the header row.
    #[error("Missing column {name:?} (available: {available})")]
    MissingColumn {
        /// The column that was looked up.
        name: String,
        /// Comma-separated header names that do exist.
        available: String,
    },

    /// The neighbor-count engine rejected its input.
    #[error(transparent)]
    NeighborCount(#[from] NeighborCountError),
}

/// Loads a [`PipelineConfig`] from a TOML file. Missing keys take their
/// defaults.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML for a
/// [`PipelineConfig`].
pub fn load_config(path: &Path) -> Result<PipelineConfig, IngestError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents).map_err(|message| IngestError::Config {
        path: path.to_path_buf(),
        message,
    })
}

/// Parses a [`PipelineConfig`] from a TOML string.
///
/// # Errors
///
/// Returns the parser's message if the TOML is invalid.
pub fn parse_config(toml_str: &str) -> Result<PipelineConfig, String> {
    toml::de::from_str(toml_str).map_err(|e| e.to_string())
}

/// `<dir>/<stem>_<suffix><.ext>` for an input path.
#[must_use]
pub fn default_output_path(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "output".into(), |s| s.to_string_lossy());
    let name = input.extension().map_or_else(
        || format!("{stem}_{suffix}"),
        |ext| format!("{stem}_{suffix}.{}", ext.to_string_lossy()),
    );
    input.with_file_name(name)
}

/// Default directory for per-year files: `yearly` next to the input.
#[must_use]
pub fn default_split_dir(input: &Path) -> PathBuf {
    input
        .parent()
        .map_or_else(|| PathBuf::from("yearly"), |p| p.join("yearly"))
}

fn open(path: &Path) -> Result<BufReader<File>, IngestError> {
    log::info!("Reading {}", path.display());
    Ok(BufReader::new(File::open(path)?))
}

fn create(path: &Path) -> Result<BufWriter<File>, IngestError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Runs [`clean::clean`] from `input` to `output` (default
/// `<stem>_cleaned.csv`). Returns the report and the output path.
///
/// # Errors
///
/// See [`clean::clean`].
pub fn clean_file(
    input: &Path,
    output: Option<PathBuf>,
    config: &PipelineConfig,
) -> Result<(CleanReport, PathBuf), IngestError> {
    let output = output.unwrap_or_else(|| default_output_path(input, "cleaned"));
    let report = clean::clean(open(input)?, create(&output)?, config)?;
    log::info!("[5] Cleaned file written to: {}", output.display());
    Ok((report, output))
}

/// Runs [`filter::filter_since`] from `input` to `output` (default
/// `<stem>_<since>_onward.csv`).
///
/// # Errors
///
/// See [`filter::filter_since`].
pub fn filter_since_file(
    input: &Path,
    output: Option<PathBuf>,
    since: MonthStamp,
    config: &PipelineConfig,
) -> Result<(FilterReport, PathBuf), IngestError> {
    let output = output.unwrap_or_else(|| default_output_path(input, &format!("{since}_onward")));
    let report = filter::filter_since(open(input)?, create(&output)?, since, config)?;
    log::info!("Saved filtered data to: {}", output.display());
    Ok((report, output))
}

/// Runs [`split::split_by_year`] on `input`, writing into `output_dir`
/// (default `yearly/` next to the input).
///
/// # Errors
///
/// See [`split::split_by_year`].
pub fn split_by_year_file(
    input: &Path,
    output_dir: Option<PathBuf>,
    prefix: &str,
    config: &PipelineConfig,
) -> Result<SplitReport, IngestError> {
    let output_dir = output_dir.unwrap_or_else(|| default_split_dir(input));
    let report = split::split_by_year(open(input)?, &output_dir, prefix, config)?;

    let input_bytes = std::fs::metadata(input)?.len();
    #[allow(clippy::cast_precision_loss)] // display-only MB value
    let input_mb = input_bytes as f64 / (1024.0 * 1024.0);
    log::info!("Original file size: {input_mb:.2} MB");

    Ok(report)
}

/// Runs [`count::count_neighbors`] from `input` to `output` (default
/// `<stem>_<output column>.csv`).
///
/// # Errors
///
/// See [`count::count_neighbors`].
pub fn count_neighbors_file(
    input: &Path,
    output: Option<PathBuf>,
    config: &PipelineConfig,
    progress: &dyn ProgressCallback,
) -> Result<(CountReport, PathBuf), IngestError> {
    let output = output.unwrap_or_else(|| default_output_path(input, &config.output_column));
    let rows = open(input)?;

    // Count into memory first so a rejected input never leaves a truncated
    // output file behind.
    let mut buffer = Vec::new();
    let report = count::count_neighbors(rows, &mut buffer, config, progress)?;

    std::io::Write::write_all(&mut create(&output)?, &buffer)?;
    log::info!("Wrote output to: {}", output.display());
    Ok((report, output))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_output_keeps_directory_and_extension() {
        let out = default_output_path(Path::new("data/burglaries.csv"), "cleaned");
        assert_eq!(out, PathBuf::from("data/burglaries_cleaned.csv"));

        let out = default_output_path(Path::new("raw"), "num_crimes_past_year_1km");
        assert_eq!(out, PathBuf::from("raw_num_crimes_past_year_1km"));
    }

    #[test]
    fn split_dir_sits_next_to_input() {
        assert_eq!(
            default_split_dir(Path::new("data/all.csv")),
            PathBuf::from("data/yearly")
        );
    }

    #[test]
    fn config_errors_carry_the_parser_message() {
        let err = parse_config("invalid_rows = \"sometimes\"").unwrap_err();
        assert!(err.contains("sometimes") || err.contains("variant"), "{err}");
    }

    #[test]
    fn load_config_error_names_the_file() {
        let dir = std::env::temp_dir().join(format!("crime_risk_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.toml");
        std::fs::write(&path, "invalid_rows = \"sometimes\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, IngestError::Config { .. }));
        let text = err.to_string();
        assert!(text.contains(&path.display().to_string()), "{text}");
        assert!(text.contains("sometimes"), "{text}");

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn load_config_reads_partial_toml() {
        let dir = std::env::temp_dir().join(format!("crime_risk_config_ok_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("pipeline.toml");
        std::fs::write(&path, "invalid_rows = \"drop\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.invalid_rows, crime_risk_ingest_models::InvalidRowPolicy::Drop);
        assert_eq!(config.output_column, crime_risk_ingest_models::DEFAULT_OUTPUT_COLUMN);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn count_file_round_trip() {
        let dir = std::env::temp_dir().join(format!("crime_risk_count_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("incidents.csv");
        std::fs::write(
            &input,
            "Month,Latitude,Longitude\n2020-01,51.5,-0.1\n2020-02,51.5,-0.1\n",
        )
        .unwrap();

        let (report, output) = count_neighbors_file(
            &input,
            None,
            &PipelineConfig::default(),
            &crime_risk_spatial::progress::NullProgress,
        )
        .unwrap();

        assert_eq!(output, dir.join("incidents_num_crimes_past_year_1km.csv"));
        assert_eq!(report.non_zero, 1);
        let written = std::fs::read_to_string(&output).unwrap();
        assert!(written.ends_with("2020-02,51.5,-0.1,1\n"), "{written}");

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
