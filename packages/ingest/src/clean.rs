//! Clean stage: keep rows of one crime type that have usable coordinates
//! and a parseable month, and append normalized `longitude`, `latitude`,
//! and `dt` columns.

use std::io::{Read, Write};

use crime_risk_crime_models::{MonthStamp, parse_lat_lng};
use crime_risk_ingest_models::{CleanReport, PipelineConfig};

use crate::IngestError;
use crate::table::{self, OutputLayout};

/// Normalized columns written by [`clean`], in output order.
pub const DERIVED_COLUMNS: [&str; 3] = ["longitude", "latitude", "dt"];

/// Filters `input` into `output`.
///
/// Rows are checked in phases (crime type, coordinates, month) and the
/// surviving row count is logged after each one.
///
/// # Errors
///
/// Returns an error if the CSV cannot be read or written, or a required
/// column is missing.
pub fn clean<R: Read, W: Write>(
    input: R,
    output: W,
    config: &PipelineConfig,
) -> Result<CleanReport, IngestError> {
    let mut reader = table::reader(input);
    let headers = table::trimmed_headers(&mut reader)?;

    let columns = &config.columns;
    let type_idx = if config.require_crime_type {
        Some(table::column_index(&headers, &columns.crime_type)?)
    } else {
        let idx = table::find_column(&headers, &columns.crime_type);
        if idx.is_none() {
            log::warn!(
                "No {:?} column; keeping every row regardless of crime type",
                columns.crime_type
            );
        }
        idx
    };
    let month_idx = table::column_index(&headers, &columns.month)?;
    let lat_idx = table::column_index(&headers, &columns.latitude)?;
    let lng_idx = table::column_index(&headers, &columns.longitude)?;

    let layout = OutputLayout::new(&headers, &DERIVED_COLUMNS);
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(layout.headers())?;

    let mut report = CleanReport::default();

    for record in reader.records() {
        let row = record?;
        report.loaded += 1;

        if let Some(idx) = type_idx
            && !config.crime_type.matches(row.get(idx).unwrap_or_default())
        {
            continue;
        }
        report.type_matched += 1;

        let Some((lat, lng)) = parse_lat_lng(row.get(lat_idx), row.get(lng_idx)) else {
            continue;
        };
        report.geo_valid += 1;

        let Some(month) = row.get(month_idx).and_then(MonthStamp::parse) else {
            continue;
        };
        report.month_valid += 1;

        let lng = lng.to_string();
        let lat = lat.to_string();
        let dt = month.first_day().format("%Y-%m-%d").to_string();
        writer.write_record(&layout.render(&row, &[lng.as_str(), lat.as_str(), dt.as_str()]))?;
    }

    writer.flush()?;

    log::info!("[1] Loaded {} rows", report.loaded);
    log::info!(
        "[2] Rows with crime type = {}: {}",
        config.crime_type,
        report.type_matched
    );
    log::info!("[3] Geo-valid rows: {}", report.geo_valid);
    log::info!("[4] Rows with valid months: {}", report.month_valid);

    Ok(report)
}
