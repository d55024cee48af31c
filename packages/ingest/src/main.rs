#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the incident pipeline.
//!
//! Without a subcommand, falls through to the interactive menu.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crime_risk_cli_utils::IndicatifProgress;
use crime_risk_crime_models::MonthStamp;
use crime_risk_ingest::{
    DEFAULT_SPLIT_PREFIX, clean_file, count_neighbors_file, filter_since_file, load_config,
    split_by_year_file,
};
use crime_risk_ingest_models::{InvalidRowPolicy, PipelineConfig};

#[derive(Parser)]
#[command(
    name = "crime_risk_ingest",
    about = "Burglary incident cleaning and neighbor counting"
)]
struct Cli {
    /// TOML pipeline config (column names, crime type, neighbor settings)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep rows of the configured crime type with valid coordinates and month
    Clean {
        /// Raw incident CSV
        input: PathBuf,
        /// Output CSV (default: `<input>_cleaned.csv`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Keep rows from a given month onward
    FilterSince {
        /// Incident CSV
        input: PathBuf,
        /// First month to keep, `YYYY-MM`
        #[arg(long)]
        since: MonthStamp,
        /// Output CSV (default: `<input>_<since>_onward.csv`)
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write one CSV per calendar year
    SplitByYear {
        /// Incident CSV
        input: PathBuf,
        /// Directory for the per-year files (default: `yearly/` next to input)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// File name prefix, as in `<prefix>_<year>.csv`
        #[arg(long, default_value = DEFAULT_SPLIT_PREFIX)]
        prefix: String,
    },
    /// Annotate every row with the number of nearby incidents in the
    /// trailing window
    CountNeighbors {
        /// Incident CSV
        input: PathBuf,
        /// Output CSV (default: `<input>_<column>.csv`)
        #[arg(long)]
        output: Option<PathBuf>,
        /// Neighbor radius in kilometres
        #[arg(long)]
        radius_km: Option<f64>,
        /// Trailing window length in calendar months
        #[arg(long)]
        window_months: Option<u32>,
        /// Kilometres per degree used to size grid cells
        #[arg(long)]
        km_per_degree: Option<f64>,
        /// What to do with rows lacking a valid month or coordinates
        /// (`zero` or `drop`)
        #[arg(long)]
        invalid_rows: Option<InvalidRowPolicy>,
        /// Name of the count column
        #[arg(long)]
        column: Option<String>,
        /// Count in parallel chunks of this many incidents
        #[arg(long)]
        chunk_len: Option<usize>,
    },
}

#[allow(clippy::too_many_lines)]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crime_risk_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            load_config(path)?
        }
        None => PipelineConfig::default(),
    };

    let Some(command) = cli.command else {
        return crime_risk_ingest::interactive::run(&multi, &config);
    };

    match command {
        Commands::Clean { input, output } => {
            let (report, _) = clean_file(&input, output, &config)?;
            log::info!(
                "Clean complete: {} of {} rows kept",
                report.month_valid,
                report.loaded
            );
        }
        Commands::FilterSince {
            input,
            since,
            output,
        } => {
            let (report, _) = filter_since_file(&input, output, since, &config)?;
            log::info!(
                "Filter complete: {} of {} rows from {since} onward",
                report.kept,
                report.loaded
            );
        }
        Commands::SplitByYear {
            input,
            output_dir,
            prefix,
        } => {
            let report = split_by_year_file(&input, output_dir, &prefix, &config)?;
            log::info!(
                "Split complete: {} year file(s) in {:.1}s",
                report.files.len(),
                report.duration.as_secs_f64()
            );
        }
        Commands::CountNeighbors {
            input,
            output,
            radius_km,
            window_months,
            km_per_degree,
            invalid_rows,
            column,
            chunk_len,
        } => {
            if let Some(radius_km) = radius_km {
                config.neighbors.radius_km = radius_km;
            }
            if let Some(window_months) = window_months {
                config.neighbors.window_months = window_months;
            }
            if let Some(km_per_degree) = km_per_degree {
                config.neighbors.km_per_degree = km_per_degree;
            }
            if let Some(invalid_rows) = invalid_rows {
                config.invalid_rows = invalid_rows;
            }
            if let Some(column) = column {
                config.output_column = column;
            }
            if chunk_len.is_some() {
                config.chunk_len = chunk_len;
            }

            let progress = IndicatifProgress::records_bar(&multi, "Counting neighbors");
            let (report, output) =
                count_neighbors_file(&input, output, &config, progress.as_ref())?;
            log::info!(
                "Count complete: {} rows written to {} in {:.1}s",
                report.written,
                output.display(),
                report.duration.as_secs_f64()
            );
        }
    }

    Ok(())
}
