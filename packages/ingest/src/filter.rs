//! Filter stage: keep rows from a given month onward.

use std::io::{Read, Write};

use crime_risk_crime_models::MonthStamp;
use crime_risk_ingest_models::{FilterReport, PipelineConfig};

use crate::IngestError;
use crate::table::{self, OutputLayout};

/// Copies rows whose month is `since` or later from `input` to `output`.
///
/// The month column is rewritten as `YYYY-MM`. Rows with unparseable months
/// are dropped.
///
/// # Errors
///
/// Returns an error if the CSV cannot be read or written, or the month
/// column is missing.
pub fn filter_since<R: Read, W: Write>(
    input: R,
    output: W,
    since: MonthStamp,
    config: &PipelineConfig,
) -> Result<FilterReport, IngestError> {
    let mut reader = table::reader(input);
    let headers = table::trimmed_headers(&mut reader)?;
    let month_column = config.columns.month.as_str();
    let month_idx = table::column_index(&headers, month_column)?;

    let layout = OutputLayout::new(&headers, &[month_column]);
    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(layout.headers())?;

    let mut report = FilterReport::default();

    for record in reader.records() {
        let row = record?;
        report.loaded += 1;

        let Some(month) = row.get(month_idx).and_then(MonthStamp::parse) else {
            report.invalid_month += 1;
            continue;
        };
        if month < since {
            continue;
        }

        let month = month.to_string();
        writer.write_record(&layout.render(&row, &[month.as_str()]))?;
        report.kept += 1;
    }

    writer.flush()?;

    log::info!(
        "Kept {} of {} rows from {since} onward ({} with unparseable months dropped)",
        report.kept,
        report.loaded,
        report.invalid_month
    );

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_rows_from_cutoff_and_normalizes_month() {
        let input = "\
Month,Latitude,Longitude
2020-12,51.5,-0.1
2021-01-01,51.5,-0.1
bad,51.5,-0.1
2022-06,51.5,-0.1
";
        let mut out = Vec::new();
        let report = filter_since(
            input.as_bytes(),
            &mut out,
            MonthStamp::from_ym(2021, 1).unwrap(),
            &PipelineConfig::default(),
        )
        .unwrap();

        assert_eq!(
            report,
            FilterReport {
                loaded: 4,
                invalid_month: 1,
                kept: 2,
            }
        );
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Month,Latitude,Longitude\n2021-01,51.5,-0.1\n2022-06,51.5,-0.1\n"
        );
    }
}
