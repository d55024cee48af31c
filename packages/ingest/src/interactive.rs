#![allow(clippy::module_name_repetitions)]

//! Interactive menu for the incident pipeline.
//!
//! Provides a menu-driven interface using `dialoguer` for running the
//! pipeline stages without memorizing CLI flags.

use std::path::PathBuf;

use crime_risk_cli_utils::{IndicatifProgress, MultiProgress};
use crime_risk_crime_models::MonthStamp;
use crime_risk_ingest_models::{InvalidRowPolicy, PipelineConfig};
use dialoguer::{Confirm, Input, Select};

use crate::DEFAULT_SPLIT_PREFIX;

/// Top-level actions available in the interactive menu.
enum PipelineAction {
    Clean,
    FilterSince,
    SplitByYear,
    CountNeighbors,
}

impl PipelineAction {
    const ALL: &[Self] = &[
        Self::Clean,
        Self::FilterSince,
        Self::SplitByYear,
        Self::CountNeighbors,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Clean => "Clean raw incidents",
            Self::FilterSince => "Keep incidents from a month onward",
            Self::SplitByYear => "Split incidents by year",
            Self::CountNeighbors => "Count neighbors in the trailing window",
        }
    }
}

/// Runs the interactive menu, prompting the user to select and configure
/// a pipeline stage.
///
/// # Errors
///
/// Returns an error if a prompt fails or the selected stage fails.
pub fn run(
    multi: &MultiProgress,
    config: &PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let labels: Vec<&str> = PipelineAction::ALL
        .iter()
        .map(PipelineAction::label)
        .collect();

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let input = prompt_path("Input CSV")?;

    match PipelineAction::ALL[idx] {
        PipelineAction::Clean => {
            let output = prompt_optional_path("Output CSV (empty for default)")?;
            let (report, output) = crate::clean_file(&input, output, config)?;
            println!(
                "Kept {} of {} rows -> {}",
                report.month_valid,
                report.loaded,
                output.display()
            );
        }
        PipelineAction::FilterSince => {
            let since: MonthStamp = Input::new()
                .with_prompt("First month to keep (YYYY-MM)")
                .interact_text()?;
            let output = prompt_optional_path("Output CSV (empty for default)")?;
            let (report, output) = crate::filter_since_file(&input, output, since, config)?;
            println!(
                "Kept {} of {} rows -> {}",
                report.kept,
                report.loaded,
                output.display()
            );
        }
        PipelineAction::SplitByYear => {
            let output_dir = prompt_optional_path("Output directory (empty for default)")?;
            let prefix: String = Input::new()
                .with_prompt("File prefix")
                .default(DEFAULT_SPLIT_PREFIX.to_string())
                .interact_text()?;
            let report = crate::split_by_year_file(&input, output_dir, &prefix, config)?;
            println!("{:<6} {:>10} PATH", "YEAR", "ROWS");
            println!("{}", "-".repeat(50));
            for file in &report.files {
                println!("{:<6} {:>10} {}", file.year, file.rows, file.path.display());
            }
        }
        PipelineAction::CountNeighbors => count_neighbors_interactive(multi, &input, config)?,
    }

    Ok(())
}

/// Prompts for neighbor-count settings, starting from `config`, and runs
/// the count stage.
fn count_neighbors_interactive(
    multi: &MultiProgress,
    input: &std::path::Path,
    config: &PipelineConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = config.clone();

    config.neighbors.radius_km = Input::new()
        .with_prompt("Radius (km)")
        .default(config.neighbors.radius_km)
        .interact_text()?;
    config.neighbors.window_months = Input::new()
        .with_prompt("Window (months)")
        .default(config.neighbors.window_months)
        .interact_text()?;

    let drop_invalid = Confirm::new()
        .with_prompt("Drop rows without a valid month or coordinates?")
        .default(config.invalid_rows == InvalidRowPolicy::Drop)
        .interact()?;
    config.invalid_rows = if drop_invalid {
        InvalidRowPolicy::Drop
    } else {
        InvalidRowPolicy::Zero
    };

    let parallel = Confirm::new()
        .with_prompt("Count in parallel chunks?")
        .default(config.chunk_len.is_some())
        .interact()?;
    config.chunk_len = if parallel {
        Some(
            Input::new()
                .with_prompt("Chunk length")
                .default(
                    config
                        .chunk_len
                        .unwrap_or(crime_risk_spatial::DEFAULT_CHUNK_LEN),
                )
                .interact_text()?,
        )
    } else {
        None
    };

    let output = prompt_optional_path("Output CSV (empty for default)")?;

    let progress = IndicatifProgress::records_bar(multi, "Counting neighbors");
    let (report, output) = crate::count_neighbors_file(input, output, &config, progress.as_ref())?;

    println!(
        "{} rows written ({} non-zero) -> {}",
        report.written,
        report.non_zero,
        output.display()
    );

    Ok(())
}

fn prompt_path(prompt: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let input: String = Input::new().with_prompt(prompt).interact_text()?;
    Ok(PathBuf::from(input.trim()))
}

fn prompt_optional_path(prompt: &str) -> Result<Option<PathBuf>, Box<dyn std::error::Error>> {
    let input: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;

    if input.trim().is_empty() {
        Ok(None)
    } else {
        Ok(Some(PathBuf::from(input.trim())))
    }
}
