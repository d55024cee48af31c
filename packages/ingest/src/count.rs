//! Count stage: annotate every incident row with its neighbor count.

use std::io::{Read, Write};
use std::time::Instant;

use crime_risk_crime_models::{Incident, MonthStamp, parse_lat_lng};
use crime_risk_ingest_models::{CountReport, InvalidRowPolicy, PipelineConfig};
use crime_risk_spatial::progress::ProgressCallback;
use crime_risk_spatial::{compute_neighbor_counts_parallel, compute_neighbor_counts_with_progress};
use csv::StringRecord;

use crate::IngestError;
use crate::table::{self, OutputLayout};

/// Annotates incident rows with their neighbor counts.
///
/// Reads rows from `input`, counts neighbors for every row with a valid
/// month and coordinates, and writes all rows back to `output` in their
/// original order with `config.output_column` filled in.
///
/// Valid rows are stably sorted by month before they reach the engine.
/// Rows that cannot be counted are written with a count of 0 or left out,
/// according to `config.invalid_rows`.
///
/// # Errors
///
/// Returns an error if the CSV cannot be read or written, a required column
/// is missing, or the engine rejects its input.
pub fn count_neighbors<R: Read, W: Write>(
    input: R,
    output: W,
    config: &PipelineConfig,
    progress: &dyn ProgressCallback,
) -> Result<CountReport, IngestError> {
    let start = Instant::now();

    let mut reader = table::reader(input);
    let headers = table::trimmed_headers(&mut reader)?;
    let columns = &config.columns;
    let month_idx = table::column_index(&headers, &columns.month)?;
    let lat_idx = table::column_index(&headers, &columns.latitude)?;
    let lng_idx = table::column_index(&headers, &columns.longitude)?;

    let rows: Vec<StringRecord> = reader.records().collect::<Result<_, _>>()?;
    log::info!("[1] Loaded {} rows", rows.len());

    let months: Vec<Option<MonthStamp>> = rows
        .iter()
        .map(|row| row.get(month_idx).and_then(MonthStamp::parse))
        .collect();
    let month_valid = months.iter().flatten().count();
    log::info!("[2] Rows with valid month: {month_valid}");

    let mut valid: Vec<(usize, Incident)> = rows
        .iter()
        .zip(&months)
        .enumerate()
        .filter_map(|(row_idx, (row, month))| {
            let month = (*month)?;
            let (lat, lng) = parse_lat_lng(row.get(lat_idx), row.get(lng_idx))?;
            Some((row_idx, Incident::new(month, lat, lng)))
        })
        .collect();
    log::info!("[3] Geo-valid rows: {}", valid.len());

    valid.sort_by_key(|(_, incident)| incident.month);
    let incidents: Vec<Incident> = valid.iter().map(|(_, incident)| *incident).collect();
    log::info!("[4] Processing {} sorted rows", incidents.len());

    let counts = match config.chunk_len {
        Some(chunk_len) => {
            compute_neighbor_counts_parallel(&incidents, &config.neighbors, chunk_len, progress)?
        }
        None => compute_neighbor_counts_with_progress(&incidents, &config.neighbors, progress)?,
    };
    log::info!("[5] Sample counts: {:?}", &counts[..counts.len().min(5)]);

    let mut by_row: Vec<Option<u32>> = vec![None; rows.len()];
    for ((row_idx, _), count) in valid.iter().zip(&counts) {
        by_row[*row_idx] = Some(*count);
    }

    let layout = OutputLayout::new(&headers, &[config.output_column.as_str()]);
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(layout.headers())?;

    let mut written = 0;
    for (row, count) in rows.iter().zip(&by_row) {
        let count = match (count, config.invalid_rows) {
            (Some(count), _) => *count,
            (None, InvalidRowPolicy::Zero) => 0,
            (None, InvalidRowPolicy::Drop) => continue,
        };
        let count = count.to_string();
        writer.write_record(&layout.render(row, &[count.as_str()]))?;
        written += 1;
    }
    writer.flush()?;

    let report = CountReport {
        loaded: rows.len() as u64,
        month_valid: month_valid as u64,
        geo_valid: incidents.len() as u64,
        non_zero: counts.iter().filter(|&&c| c > 0).count() as u64,
        written,
        duration: start.elapsed(),
    };

    log::info!("[6] Non-zero counts: {}", report.non_zero);
    log::info!(
        "[7] Wrote {} rows ({} policy for {} uncounted rows) in {:.1}s",
        report.written,
        config.invalid_rows,
        report.loaded - report.geo_valid,
        report.duration.as_secs_f64()
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use crime_risk_spatial::progress::NullProgress;
    use crime_risk_spatial::{InvalidInput, NeighborCountError};

    use super::*;

    // Rows deliberately out of chronological order; one bad month and one
    // bad coordinate.
    const INPUT: &str = "\
Crime ID,Month,Longitude,Latitude
c,2020-07,-0.2000,51.6000
a,2020-01,-0.1000,51.5000
x,not-a-month,-0.1000,51.5000
b,2020-06,-0.1005,51.5005
y,2020-08,,51.5000
";

    fn run(config: &PipelineConfig) -> (CountReport, String) {
        let mut out = Vec::new();
        let report = count_neighbors(INPUT.as_bytes(), &mut out, config, &NullProgress).unwrap();
        (report, String::from_utf8(out).unwrap())
    }

    #[test]
    fn keeps_original_order_and_zero_fills_invalid_rows() {
        let (report, out) = run(&PipelineConfig::default());
        assert_eq!(
            out,
            "\
Crime ID,Month,Longitude,Latitude,num_crimes_past_year_1km
c,2020-07,-0.2000,51.6000,0
a,2020-01,-0.1000,51.5000,0
x,not-a-month,-0.1000,51.5000,0
b,2020-06,-0.1005,51.5005,1
y,2020-08,,51.5000,0
"
        );
        assert_eq!(report.loaded, 5);
        assert_eq!(report.month_valid, 4);
        assert_eq!(report.geo_valid, 3);
        assert_eq!(report.non_zero, 1);
        assert_eq!(report.written, 5);
    }

    #[test]
    fn drop_policy_removes_uncounted_rows() {
        let config = PipelineConfig {
            invalid_rows: InvalidRowPolicy::Drop,
            ..PipelineConfig::default()
        };
        let (report, out) = run(&config);
        let ids: Vec<&str> = out
            .lines()
            .skip(1)
            .map(|l| l.split(',').next().unwrap())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
        assert_eq!(report.written, 3);
    }

    #[test]
    fn parallel_chunks_give_the_same_output() {
        let (_, sequential) = run(&PipelineConfig::default());
        let (_, parallel) = run(&PipelineConfig {
            chunk_len: Some(1),
            ..PipelineConfig::default()
        });
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn existing_output_column_is_overwritten() {
        let input = "Month,Latitude,Longitude,num_crimes_past_year_1km\n\
                     2020-01,51.5,-0.1,99\n\
                     2020-02,51.5,-0.1,99\n";
        let mut out = Vec::new();
        count_neighbors(
            input.as_bytes(),
            &mut out,
            &PipelineConfig::default(),
            &NullProgress,
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Month,Latitude,Longitude,num_crimes_past_year_1km\n\
             2020-01,51.5,-0.1,0\n\
             2020-02,51.5,-0.1,1\n"
        );
    }

    #[test]
    fn engine_errors_surface_without_output_rows() {
        let config = PipelineConfig {
            neighbors: crime_risk_spatial::NeighborCountConfig {
                radius_km: -1.0,
                ..Default::default()
            },
            ..PipelineConfig::default()
        };
        let mut out = Vec::new();
        let err = count_neighbors(INPUT.as_bytes(), &mut out, &config, &NullProgress).unwrap_err();
        assert!(matches!(
            err,
            IngestError::NeighborCount(NeighborCountError::InvalidInput(
                InvalidInput::NonPositiveRadius { .. }
            ))
        ));
        assert!(out.is_empty());
    }
}
